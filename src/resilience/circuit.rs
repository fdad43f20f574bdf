//! Per-provider circuit breaker
//!
//! Tracks consecutive failures for one upstream provider and stops calling it
//! for a cooldown period once the failure threshold is reached. Recovery is
//! lazy: the first call arriving after the cooldown becomes a half-open probe;
//! further calls fail fast until the probe reports back.

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Breaker states. `Open` rejects calls outright, `HalfOpen` admits a single
/// probe to test recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Error)]
pub enum CircuitError<E: std::error::Error + 'static> {
    /// The breaker rejected the call without invoking the operation.
    #[error("circuit open for provider {0}: failing fast")]
    Open(String),
    /// The operation ran and failed; the failure has been recorded.
    #[error("upstream call failed: {0}")]
    Upstream(#[source] E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Consecutive-failure breaker guarding one provider.
///
/// The inner state is mutex-guarded; the lock is taken only to admit a call
/// and to record its outcome, never across the operation itself.
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.failure_count
    }

    /// Invoke `op` under the breaker. Fails fast with [`CircuitError::Open`]
    /// while the circuit is open and the cooldown has not elapsed; otherwise
    /// runs the operation and records its outcome.
    pub async fn guard<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        if !self.admit().await {
            return Err(CircuitError::Open(self.name.clone()));
        }

        match op().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitError::Upstream(err))
            }
        }
    }

    /// Decide whether a call may proceed, flipping Open to HalfOpen when the
    /// cooldown has elapsed. At most one probe is admitted per cooldown: a
    /// breaker already HalfOpen rejects until the probe records its outcome.
    async fn admit(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(self.reset_timeout);
                if elapsed >= self.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    info!(
                        "circuit for {} half-open after {:?}, admitting probe",
                        self.name, elapsed
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Closed {
            info!("circuit for {} closed after successful call", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        // A failed half-open probe lands here too: its count is still at or
        // above the threshold (the count only resets on success), so the
        // breaker reopens and the cooldown restarts.
        if inner.failure_count >= self.threshold && inner.state != CircuitState::Open {
            warn!(
                "circuit for {} opened after {} consecutive failures",
                self.name, inner.failure_count
            );
            inner.state = CircuitState::Open;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new("test", threshold, Duration::from_millis(reset_ms))
    }

    async fn fail(breaker: &CircuitBreaker, calls: &AtomicU32) {
        let result = breaker
            .guard(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), Boom>(Boom) }
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn opens_at_threshold_and_fails_fast() {
        let breaker = breaker(3, 60_000);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            fail(&breaker, &calls).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        // Rejected without invoking the operation.
        let result = breaker
            .guard(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Boom>(()) }
            })
            .await;
        assert!(matches!(result, Err(CircuitError::Open(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn half_open_admits_exactly_one_probe() {
        let breaker = breaker(1, 20);
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // First arrival after the cooldown becomes the probe; a second
        // arrival while the breaker is half-open is rejected outright.
        assert!(breaker.admit().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);
        assert!(!breaker.admit().await);
    }

    #[tokio::test]
    async fn successful_probe_closes_and_resets_count() {
        let breaker = breaker(2, 10);
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await;
        fail(&breaker, &calls).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = breaker.guard(|| async { Ok::<_, Boom>("recovered") }).await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert_eq!(breaker.failure_count().await, 0);
    }

    #[tokio::test]
    async fn failed_probe_reopens() {
        let breaker = breaker(1, 10);
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        fail(&breaker, &calls).await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        // Cooldown restarted; the next arrival is rejected again.
        assert!(!breaker.admit().await);
    }

    #[tokio::test]
    async fn success_resets_after_sub_threshold_failures() {
        let breaker = breaker(3, 60_000);
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await;
        fail(&breaker, &calls).await;
        assert_eq!(breaker.failure_count().await, 2);

        let result = breaker.guard(|| async { Ok::<_, Boom>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.failure_count().await, 0);
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
