// src/api/rate_limit.rs
//! Minimum spacing between requests to the search service.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// One permit per interval, burst of one, shared by every worker in a run.
///
/// Waiting happens asynchronously, so a worker blocked on a permit never
/// holds up a task that is waiting on human input.
pub struct RequestLimiter {
    inner: Option<DefaultDirectRateLimiter>,
    interval: Duration,
}

impl RequestLimiter {
    /// A zero interval disables limiting.
    pub fn new(min_interval: Duration) -> Self {
        let inner = Quota::with_period(min_interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
        Self {
            inner,
            interval: min_interval,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next request may be sent.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.inner {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}
