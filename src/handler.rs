//! Query handling.
//!
//! Runs one inbound query through the pipeline:
//! 1. Cache lookup by the first question
//! 2. On a miss, exchange with upstream and cache the answer
//! 3. On upstream failure, answer SERVFAIL
//!
//! Transports own the sockets; the handler only turns requests into replies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hickory_proto::op::{Message, ResponseCode};
use tracing::{debug, warn};

use crate::cache::{CacheKey, DnsCache};
use crate::dns;
use crate::stats::{Stats, StatsSnapshot};
use crate::upstream::Exchange;

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Served from the cache.
    Cached,
    /// Answered by upstream after `upstream` spent waiting on it.
    Forwarded { upstream: Duration },
    /// Upstream failed; the reply is SERVFAIL.
    Failed,
    /// The request had no question; the reply is FORMERR.
    Rejected,
}

/// A reply ready to be written back to the client.
#[derive(Debug, Clone)]
pub struct Reply {
    pub message: Message,
    pub resolution: Resolution,
    pub elapsed: Duration,
}

/// Handles queries against a shared cache and an upstream.
pub struct QueryHandler {
    cache: Arc<DnsCache>,
    upstream: Arc<dyn Exchange>,
    stats: Stats,
}

impl QueryHandler {
    pub fn new(cache: Arc<DnsCache>, upstream: Arc<dyn Exchange>) -> Self {
        Self {
            cache,
            upstream,
            stats: Stats::new(),
        }
    }

    /// Produce the reply for `request`.
    ///
    /// Never fails: upstream errors become SERVFAIL. The reply always carries
    /// the request's transaction ID and mirrors its EDNS0 state.
    pub async fn handle(&self, request: &Message) -> Reply {
        let start = Instant::now();

        let Some(question) = request.queries().first() else {
            let mut message =
                Message::error_msg(request.id(), request.op_code(), ResponseCode::FormErr);
            dns::echo_edns(request, &mut message);
            return self.finish(message, Resolution::Rejected, start);
        };
        let key = CacheKey::from_query(question);

        if let Some(mut message) = self.cache.get(&key) {
            message.set_id(request.id());
            dns::echo_edns(request, &mut message);
            return self.finish(message, Resolution::Cached, start);
        }

        let upstream_start = Instant::now();
        match self.upstream.exchange(request).await {
            Ok(mut message) => {
                let upstream = upstream_start.elapsed();
                self.cache.put(key, &message);
                message.set_id(request.id());
                dns::echo_edns(request, &mut message);
                self.finish(message, Resolution::Forwarded { upstream }, start)
            }
            Err(e) => {
                warn!(domain = key.name(), error = %e, "upstream exchange failed");
                let mut message = dns::servfail(request);
                dns::echo_edns(request, &mut message);
                self.finish(message, Resolution::Failed, start)
            }
        }
    }

    fn finish(&self, message: Message, resolution: Resolution, start: Instant) -> Reply {
        let elapsed = start.elapsed();
        match resolution {
            Resolution::Cached => self.stats.record_cached(elapsed),
            Resolution::Forwarded { .. } => self.stats.record_forwarded(elapsed),
            Resolution::Failed | Resolution::Rejected => self.stats.record_failed(elapsed),
        }
        debug!(id = message.id(), rcode = ?message.response_code(), ?resolution, "reply ready");

        Reply {
            message,
            resolution,
            elapsed,
        }
    }

    pub fn cache(&self) -> &DnsCache {
        &self.cache
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}
