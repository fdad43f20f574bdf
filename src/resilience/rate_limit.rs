//! Fixed-window rate limiting
//!
//! One counter per client identifier, reset at fixed window boundaries. This
//! is deliberately not a sliding window: a burst straddling a boundary can
//! momentarily admit close to twice the limit, which is accepted behavior.
//! Windows are created lazily and live for the process lifetime.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Per-client fixed-window request counter.
pub struct RateLimiter {
    window: Duration,
    limit: u32,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window,
            limit,
            windows: DashMap::new(),
        }
    }

    /// Count one request from `client_id` and report whether it is admitted.
    ///
    /// A fresh or elapsed window restarts at count 1 and admits; otherwise the
    /// counter increments and the request is admitted iff it stays within the
    /// limit. The dashmap entry guard makes the read-modify-write atomic per
    /// client.
    pub fn admit(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(client_id.to_string())
            .or_insert(RateWindow {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 1;
            entry.window_start = now;
            return true;
        }

        entry.count += 1;
        let admitted = entry.count <= self.limit;
        if !admitted {
            debug!(
                "rate limit hit for client {}: {} requests in window",
                client_id, entry.count
            );
        }
        admitted
    }

    /// Number of client windows currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        for _ in 0..10 {
            assert!(limiter.admit("client-a"));
        }
        assert!(!limiter.admit("client-a"));
    }

    #[test]
    fn clients_are_counted_independently() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.admit("a"));
        assert!(limiter.admit("a"));
        assert!(!limiter.admit("a"));
        assert!(limiter.admit("b"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[tokio::test]
    async fn elapsed_window_restarts_at_one() {
        let limiter = RateLimiter::new(Duration::from_millis(20), 2);
        assert!(limiter.admit("a"));
        assert!(limiter.admit("a"));
        assert!(!limiter.admit("a"));

        tokio::time::sleep(Duration::from_millis(30)).await;

        // New window: counter restarted, full budget available again.
        assert!(limiter.admit("a"));
        assert!(limiter.admit("a"));
        assert!(!limiter.admit("a"));
    }
}
