//! Retry with exponential backoff
//!
//! Wraps a fallible async operation and re-runs it until it succeeds or the
//! attempt budget is spent. The delay before attempt `n` is
//! `base_delay * 2^(n-1)` plus a uniform jitter of up to 100ms; the delay
//! itself is unbounded, so callers bound `max_retries` instead.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Maximum jitter added to every backoff delay, in milliseconds.
const JITTER_MAX_MS: u64 = 100;

/// Classifies errors the retrier is allowed to re-attempt.
///
/// Structural failures (a malformed response will not change shape on retry)
/// and authentication failures opt out by returning `false`.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Attempt budget and delay curve for [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Backoff before retry `attempt` (1-based): `base * 2^(attempt-1) + jitter`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MAX_MS));
        backoff + jitter
    }
}

/// Run `op` until it succeeds, the attempt budget is exhausted, or it fails
/// with a non-retryable error. The last error is propagated unchanged; every
/// attempt either fully succeeds or fully fails.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + Retryable,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(err);
                }
                if !err.is_retryable() {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    policy.max_retries + 1,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FlakyError {
        retryable: bool,
    }

    impl Display for FlakyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky failure")
        }
    }

    impl Retryable for FlakyError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_k_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FlakyError { retryable: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries_plus_one_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FlakyError> = retry_with_backoff(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FlakyError { retryable: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FlakyError> = retry_with_backoff(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FlakyError { retryable: false }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200));
        let jitter = Duration::from_millis(JITTER_MAX_MS);

        for (attempt, base_ms) in [(1u32, 200u64), (2, 400), (3, 800)] {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(base_ms));
            assert!(delay < Duration::from_millis(base_ms) + jitter);
        }
    }
}
