//! Resilience layer
//!
//! Retry policy, per-endpoint rate limiting and circuit breaking around
//! mint requests, plus idempotency keys for mutating operations.

use std::future::Future;
use std::sync::Arc;

use tokio::time::sleep;

use crate::error::{Error, ErrorCategory};

mod breaker;
mod rate_limit;
mod retry;

pub use breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::RetryPolicy;

/// Supplies idempotency keys for mutating requests
///
/// The key must be stable across retries of the same logical operation; a
/// new key is drawn per operation, never per attempt.
pub trait IdempotencyKeyProvider: Send + Sync + std::fmt::Debug {
    /// A fresh key for one logical operation
    fn next_key(&self) -> String;
}

/// Default provider backed by UUID v4
#[derive(Debug, Default)]
pub struct UuidIdempotencyProvider;

impl IdempotencyKeyProvider for UuidIdempotencyProvider {
    fn next_key(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Context handed to each attempt of a resilient operation
#[derive(Debug, Clone)]
pub struct AttemptContext {
    /// 1-indexed attempt number
    pub attempt: u32,
    /// Idempotency key, stable across the operation's attempts
    ///
    /// Transports must preserve an already-set `Idempotency-Key` header
    /// and populate a missing one from this value.
    pub idempotency_key: String,
}

/// Combined retry, rate-limit and circuit-breaker gate for mint requests
#[derive(Debug)]
pub struct Resilience {
    retry: RetryPolicy,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    idempotency: Arc<dyn IdempotencyKeyProvider>,
}

impl Resilience {
    /// New resilience gate
    pub fn new(
        retry: RetryPolicy,
        limiter_config: RateLimiterConfig,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            retry,
            limiter: RateLimiter::new(limiter_config),
            breaker: CircuitBreaker::new(breaker_config),
            idempotency: Arc::new(UuidIdempotencyProvider),
        }
    }

    /// Replace the idempotency key provider
    pub fn with_idempotency_provider(mut self, provider: Arc<dyn IdempotencyKeyProvider>) -> Self {
        self.idempotency = provider;
        self
    }

    /// The circuit breaker, for state observation
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run `op` against `endpoint` under the full policy
    ///
    /// Before each attempt the circuit breaker is consulted and the rate
    /// limiter awaited. Retryable errors are retried up to `max_attempts`
    /// with exponential backoff; terminal errors surface immediately.
    /// Cancellation (dropping the returned future, or an
    /// [`Error::OperationCancelled`] from `op`) aborts without advancing
    /// the retry counter or recording a breaker failure.
    pub async fn execute<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut(AttemptContext) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let idempotency_key = self.idempotency.next_key();

        let mut attempt: u32 = 1;
        loop {
            if !self.breaker.allow_request(endpoint).await {
                return Err(Error::MintUnavailable);
            }

            self.limiter.wait_for_availability(endpoint).await;
            self.limiter.record_request(endpoint).await;

            let context = AttemptContext {
                attempt,
                idempotency_key: idempotency_key.clone(),
            };

            match op(context).await {
                Ok(value) => {
                    self.breaker.record_success(endpoint).await;
                    return Ok(value);
                }
                Err(Error::OperationCancelled) => {
                    return Err(Error::OperationCancelled);
                }
                Err(err) => {
                    // Only transport-level failures count against the
                    // breaker; protocol and validation errors do not mark
                    // the endpoint unhealthy
                    if err.category() == ErrorCategory::Network {
                        self.breaker.record_failure(endpoint).await;
                    }

                    if err.is_retryable() && attempt < self.retry.max_attempts {
                        let delay = self.retry.delay(attempt);
                        tracing::warn!(
                            "attempt {attempt} on {endpoint} failed ({}), retrying in {delay:?}",
                            err.code()
                        );
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(err);
                }
            }
        }
    }
}

impl Default for Resilience {
    fn default() -> Self {
        Self::new(
            RetryPolicy::default(),
            RateLimiterConfig::default(),
            CircuitBreakerConfig::default(),
        )
    }
}
