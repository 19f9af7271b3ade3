// src/error_recovery.rs
//! Retry with exponential backoff for API operations.

use crate::error::AppError;
use rand::Rng;
use std::time::Duration;

/// Bounds for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::DEFAULT_MAX_ATTEMPTS,
            initial_delay: crate::constants::DEFAULT_INITIAL_BACKOFF,
            max_delay: crate::constants::DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Retries an async operation with exponential backoff.
///
/// Only transient errors are retried; anything else is returned at once.
/// A server-supplied retry hint replaces the computed delay when it is
/// longer, but never exceeds `policy.max_delay`. When attempts run out on a throttled request the result is
/// `RateLimitExceeded`; other transient errors are returned as they are.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if attempt < max_attempts {
                    let wait = match e.retry_after() {
                        Some(hint) if hint > delay => hint.min(policy.max_delay),
                        _ => with_jitter(delay),
                    };
                    log::warn!(
                        "Attempt {}/{} failed ({}), retrying after {:?}",
                        attempt,
                        max_attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;

                    // Exponential backoff with cap
                    delay = std::cmp::min(delay * 2, policy.max_delay);
                }
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if e.is_rate_limited() => Err(AppError::RateLimitExceeded {
            attempts: max_attempts,
        }),
        Some(e) => Err(e),
        None => Err(AppError::InternalError {
            message: "Retry failed with no error".to_string(),
            source: None,
        }),
    }
}

/// Adds up to 10% random jitter so parallel workers do not retry in lockstep.
fn with_jitter(delay: Duration) -> Duration {
    let spread = delay.as_millis() as u64 / 10;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=spread))
}
