//! Forwarder orchestration.
//!
//! Owns the cache, wires the handler to the upstream client and runs the
//! UDP transport plus the housekeeping tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::DnsCache;
use crate::error::Error;
use crate::handler::QueryHandler;
use crate::transport::QueryLogger;
use crate::transport::udp::UdpTransport;
use crate::upstream::UdpUpstream;

/// Configuration for the forwarder.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:5355)
    pub bind_addr: SocketAddr,
    /// Upstream DNS servers (races all, uses first response)
    pub upstreams: Vec<SocketAddr>,
    /// Bound on one upstream exchange
    pub upstream_timeout: Duration,
    /// Lifetime of responses with an empty answer section, and the longest
    /// any response is cached
    pub default_ttl: Duration,
    /// How often expired cache entries are dropped, if at all
    pub sweep_interval: Option<Duration>,
    /// How often statistics are logged, if at all
    pub stats_interval: Option<Duration>,
    /// Log every query
    pub verbose: bool,
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.upstreams.is_empty() {
            return Err(Error::Config("at least one upstream is required".into()));
        }
        if self.upstream_timeout.is_zero() {
            return Err(Error::Config("upstream timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Run the forwarder until Ctrl-C.
pub async fn run(config: ProxyConfig) -> Result<(), Error> {
    config.validate()?;

    let cache = Arc::new(DnsCache::with_default_ttl(config.default_ttl));
    let upstream = Arc::new(UdpUpstream::new(
        config.upstreams.clone(),
        config.upstream_timeout,
    ));
    let handler = Arc::new(QueryHandler::new(cache.clone(), upstream));

    let udp = UdpTransport::bind(config.bind_addr).await?;
    info!(addr = %udp.local_addr()?, "DNS forwarder listening");
    let upstream_strs: Vec<_> = config.upstreams.iter().map(|a| a.to_string()).collect();
    info!(upstreams = %upstream_strs.join(", "), "racing upstreams");

    let listener = udp.start(handler.clone(), QueryLogger::new(config.verbose));

    if let Some(period) = config.sweep_interval {
        let cache = cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                let removed = cache.purge_expired();
                debug!(removed, remaining = cache.len(), "cache sweep");
            }
        });
    }

    if let Some(period) = config.stats_interval {
        let handler = handler.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                let stats = handler.stats_snapshot_and_reset();
                info!(
                    uptime_secs = stats.uptime_secs,
                    cache = handler.cache().len(),
                    requests = stats.requests,
                    forwarded = stats.forwarded,
                    cached = stats.cached,
                    failed = stats.failed,
                    avg_response_ms = stats.avg_response_ms,
                    "stats"
                );
            }
        });
    }

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("shutdown signal received");
        }
        _ = listener => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProxyConfig {
        ProxyConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            upstreams: vec!["127.0.0.1:53".parse().unwrap()],
            upstream_timeout: Duration::from_secs(2),
            default_ttl: Duration::from_secs(3600),
            sweep_interval: None,
            stats_interval: None,
            verbose: false,
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_upstreams() {
        let config = ProxyConfig {
            upstreams: Vec::new(),
            ..config()
        };

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = ProxyConfig {
            upstream_timeout: Duration::ZERO,
            ..config()
        };

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
