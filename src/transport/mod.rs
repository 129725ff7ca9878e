//! Transport layer for the forwarder.
//!
//! Receives DNS queries from clients, hands them to the query handler and
//! writes the replies back. Only UDP is served.

pub mod udp;

/// Maximum size of a DNS packet accepted from a client.
pub const MAX_DNS_PACKET_SIZE: usize = 4096;

use std::net::SocketAddr;

use tracing::info;

use crate::handler::{Reply, Resolution};

/// Per-query event log, emitted only in verbose mode.
#[derive(Debug, Clone, Copy)]
pub struct QueryLogger {
    verbose: bool,
}

impl QueryLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn log(&self, domain: &str, peer: SocketAddr, reply: &Reply) {
        if !self.verbose {
            return;
        }
        let total_ms = reply.elapsed.as_secs_f64() * 1000.0;
        match reply.resolution {
            Resolution::Cached => self.cached(domain, peer, total_ms),
            Resolution::Forwarded { upstream } => {
                self.forwarded(domain, peer, total_ms, upstream.as_secs_f64() * 1000.0)
            }
            Resolution::Failed => self.failed(domain, peer, total_ms),
            Resolution::Rejected => self.rejected(peer, total_ms),
        }
    }

    fn cached(&self, domain: &str, peer: SocketAddr, total_ms: f64) {
        info!(domain, %peer, total_ms, "CACHED");
    }

    fn forwarded(&self, domain: &str, peer: SocketAddr, total_ms: f64, upstream_ms: f64) {
        info!(domain, %peer, total_ms, upstream_ms, "FORWARDED");
    }

    fn failed(&self, domain: &str, peer: SocketAddr, total_ms: f64) {
        info!(domain, %peer, total_ms, "SERVFAIL");
    }

    fn rejected(&self, peer: SocketAddr, total_ms: f64) {
        info!(%peer, total_ms, "FORMERR");
    }
}
