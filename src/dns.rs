//! DNS message helpers shared by the cache and the query handler.
//!
//! Wire encoding and decoding is done by `hickory-proto`; this module only
//! derives replies from requests and reads the parts of a response that
//! matter for caching.

use std::time::Duration;

use hickory_proto::op::{Edns, Message, MessageType, ResponseCode};

/// UDP payload size advertised in every EDNS0 reply.
pub const EDNS_PAYLOAD_SIZE: u16 = 4096;

/// TTL used when a response carries no answer records.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Name of the first question, for logging.
pub fn question_name(message: &Message) -> String {
    message
        .queries()
        .first()
        .map(|q| q.name().to_ascii())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Effective cache lifetime of a response.
///
/// The minimum TTL across the answer section, starting from `default` so an
/// entry never outlives it. An empty answer section yields `default`.
pub fn effective_ttl(response: &Message, default: Duration) -> Duration {
    let ceiling = u32::try_from(default.as_secs()).unwrap_or(u32::MAX);
    let ttl = response
        .answers()
        .iter()
        .map(|record| record.ttl())
        .fold(ceiling, u32::min);

    Duration::from_secs(u64::from(ttl))
}

/// Build an empty reply to `request`.
///
/// Keeps the transaction ID, opcode, RD and CD bits and the first question.
/// The reply is never authoritative.
pub fn reply_to(request: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_authoritative(false);

    if let Some(query) = request.queries().first() {
        reply.add_query(query.clone());
    }

    reply
}

/// SERVFAIL reply used when the upstream exchange fails.
pub fn servfail(request: &Message) -> Message {
    let mut reply = reply_to(request);
    reply.set_response_code(ResponseCode::ServFail);
    reply
}

/// Mirror the request's EDNS0 state onto `reply`.
///
/// A request with an OPT record gets one back with a 4096-byte payload and
/// the same DNSSEC-OK bit. A request without one gets none, even if the
/// reply came from the cache or upstream carrying its own.
pub fn echo_edns(request: &Message, reply: &mut Message) {
    match request.extensions() {
        Some(requested) => {
            let mut edns = Edns::new();
            edns.set_max_payload(EDNS_PAYLOAD_SIZE);
            edns.set_dnssec_ok(requested.dnssec_ok());
            reply.set_edns(edns);
        }
        None => *reply.extensions_mut() = None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{OpCode, Query};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, Record, RecordType};
    use std::net::Ipv4Addr;

    fn request(id: u16) -> Message {
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        message.add_query(Query::query(
            Name::from_ascii("example.com.").unwrap(),
            RecordType::A,
        ));
        message
    }

    fn response_with_ttls(ttls: &[u32]) -> Message {
        let mut message = reply_to(&request(7));
        let name = Name::from_ascii("example.com.").unwrap();
        for (i, ttl) in ttls.iter().enumerate() {
            message.add_answer(Record::from_rdata(
                name.clone(),
                *ttl,
                RData::A(A(Ipv4Addr::new(192, 0, 2, i as u8))),
            ));
        }
        message
    }

    #[test]
    fn effective_ttl_takes_minimum_answer_ttl() {
        let response = response_with_ttls(&[300, 60, 120]);

        assert_eq!(
            effective_ttl(&response, DEFAULT_TTL),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn effective_ttl_uses_default_for_empty_answer() {
        let response = response_with_ttls(&[]);

        assert_eq!(effective_ttl(&response, DEFAULT_TTL), DEFAULT_TTL);
    }

    #[test]
    fn effective_ttl_is_capped_by_default() {
        let response = response_with_ttls(&[86400, 7200]);

        assert_eq!(effective_ttl(&response, DEFAULT_TTL), DEFAULT_TTL);
    }

    #[test]
    fn effective_ttl_allows_zero() {
        let response = response_with_ttls(&[0, 300]);

        assert_eq!(effective_ttl(&response, DEFAULT_TTL), Duration::ZERO);
    }

    #[test]
    fn servfail_keeps_id_and_question() {
        let request = request(0xbeef);
        let reply = servfail(&request);

        assert_eq!(reply.id(), 0xbeef);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert_eq!(reply.response_code(), ResponseCode::ServFail);
        assert_eq!(reply.queries(), request.queries());
        assert!(reply.answers().is_empty());
        assert!(!reply.authoritative());
        assert!(reply.recursion_desired());
    }

    #[test]
    fn echo_edns_mirrors_dnssec_ok() {
        let mut request = request(1);
        let mut edns = Edns::new();
        edns.set_max_payload(1232);
        edns.set_dnssec_ok(true);
        request.set_edns(edns);

        let mut reply = reply_to(&request);
        echo_edns(&request, &mut reply);

        let edns = reply.extensions().as_ref().expect("reply carries EDNS0");
        assert_eq!(edns.max_payload(), EDNS_PAYLOAD_SIZE);
        assert!(edns.dnssec_ok());
    }

    #[test]
    fn echo_edns_strips_opt_when_request_has_none() {
        let request = request(1);
        let mut reply = reply_to(&request);
        reply.set_edns(Edns::new());

        echo_edns(&request, &mut reply);

        assert!(reply.extensions().is_none());
    }

    #[test]
    fn question_name_falls_back_for_empty_message() {
        assert_eq!(question_name(&Message::new()), "<unknown>");
        assert_eq!(question_name(&request(1)), "example.com.");
    }
}
