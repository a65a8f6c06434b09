//! Upstream call pacing.
//!
//! Both trackers reject bursts of requests from one token. Every client
//! waits on a [`Pacer`] before each call: a token bucket holding one permit
//! that refills once per configured interval.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared gate spacing out upstream calls; clones share the same bucket.
#[derive(Clone)]
pub struct Pacer {
    limiter: Option<Arc<DirectLimiter>>,
    interval: Duration,
}

impl Pacer {
    /// One call per `interval`. A zero interval disables pacing.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter, interval }
    }

    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next upstream call is allowed
    pub async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
            trace!(interval_ms = self.interval.as_millis() as u64, "Pacer released call");
        }
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("interval", &self.interval)
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_pacer_spaces_calls() {
        let pacer = Pacer::new(Duration::from_millis(60));
        let start = Instant::now();
        pacer.ready().await;
        pacer.ready().await;
        pacer.ready().await;
        // First call is free, the next two each wait one interval
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_clones_share_bucket() {
        let pacer = Pacer::new(Duration::from_millis(60));
        let clone = pacer.clone();
        let start = Instant::now();
        pacer.ready().await;
        clone.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_unpaced_never_waits() {
        let pacer = Pacer::unpaced();
        let start = Instant::now();
        for _ in 0..20 {
            pacer.ready().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(pacer.interval(), Duration::ZERO);
    }
}
