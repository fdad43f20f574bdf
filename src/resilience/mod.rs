//! Failure-handling primitives shared by the chat pipeline
//!
//! Three independent guards: retry with exponential backoff, a per-provider
//! circuit breaker, and a fixed-window rate limiter. Each is safe under
//! concurrent invocation and holds no lock across an await point.

pub mod circuit;
pub mod rate_limit;
pub mod retry;

pub use circuit::{CircuitBreaker, CircuitError, CircuitState};
pub use rate_limit::RateLimiter;
pub use retry::{retry_with_backoff, RetryPolicy, Retryable};
