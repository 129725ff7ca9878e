//! Statistics tracking for the forwarder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Atomic statistics for tracking forwarder performance.
pub struct Stats {
    started: Instant,
    pub requests: AtomicU64,
    pub forwarded: AtomicU64,
    pub cached: AtomicU64,
    pub failed: AtomicU64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    pub fn record_forwarded(&self, elapsed: Duration) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        self.record(elapsed);
    }

    pub fn record_cached(&self, elapsed: Duration) {
        self.cached.fetch_add(1, Ordering::Relaxed);
        self.record(elapsed);
    }

    pub fn record_failed(&self, elapsed: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record(elapsed);
    }

    fn record(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_response_time_us.fetch_add(us, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let forwarded = self.forwarded.swap(0, Ordering::Relaxed);
        let cached = self.cached.swap(0, Ordering::Relaxed);
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let avg_response_ms = if requests > 0 {
            (total_us as f64 / requests as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            requests,
            forwarded,
            cached,
            failed,
            avg_response_ms,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub forwarded: u64,
    pub cached: u64,
    pub failed: u64,
    pub avg_response_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_each_outcome() {
        let stats = Stats::new();

        stats.record_cached(Duration::from_millis(1));
        stats.record_forwarded(Duration::from_millis(3));
        stats.record_failed(Duration::from_millis(2));

        let snapshot = stats.snapshot_and_reset();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.cached, 1);
        assert_eq!(snapshot.forwarded, 1);
        assert_eq!(snapshot.failed, 1);
        assert!((snapshot.avg_response_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_resets_counters() {
        let stats = Stats::new();
        stats.record_cached(Duration::from_millis(1));
        stats.snapshot_and_reset();

        let snapshot = stats.snapshot_and_reset();
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.avg_response_ms, 0.0);
    }
}
