//! Circuit breaker
//!
//! Three-state breaker per endpoint key. Closed counts consecutive
//! failures; once the threshold is reached the circuit opens and requests
//! are denied until `open_timeout` has elapsed. The first allow after the
//! timeout moves the circuit to half-open and is itself permitted as a
//! trial; while half-open, up to `half_open_max_attempts` further requests
//! are metered through. A success closes the circuit, a failure re-opens
//! it and restarts the timer.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial is allowed
    pub open_timeout: Duration,
    /// Metered requests allowed while half-open, beyond the trial
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
            half_open_max_attempts: 3,
        }
    }
}

/// Breaker state for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Circuit closed; requests flow, failures are counted
    Closed {
        /// Consecutive failures so far
        failure_count: u32,
    },
    /// Circuit open; requests are denied
    Open {
        /// When the circuit opened
        opened_at: Instant,
    },
    /// Circuit half-open; a limited number of requests are permitted
    HalfOpen {
        /// Metered permits remaining
        remaining: u32,
    },
}

/// Circuit breaker keyed by endpoint
///
/// State mutation is single-writer by construction: every transition goes
/// through the internal mutex.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<String, BreakerState>>,
}

impl CircuitBreaker {
    /// New breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a request to `endpoint` may proceed right now
    ///
    /// The first allow after `open_timeout` performs the open to half-open
    /// transition and is permitted without consuming a metered permit.
    pub async fn allow_request(&self, endpoint: &str) -> bool {
        let mut states = self.states.lock().await;
        let state = states
            .entry(endpoint.to_string())
            .or_insert(BreakerState::Closed { failure_count: 0 });

        match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.open_timeout {
                    tracing::debug!("circuit for {endpoint} half-open after timeout");
                    *state = BreakerState::HalfOpen {
                        remaining: self.config.half_open_max_attempts,
                    };
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen { remaining } => {
                if remaining > 0 {
                    *state = BreakerState::HalfOpen {
                        remaining: remaining - 1,
                    };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful request
    pub async fn record_success(&self, endpoint: &str) {
        let mut states = self.states.lock().await;
        states.insert(
            endpoint.to_string(),
            BreakerState::Closed { failure_count: 0 },
        );
    }

    /// Record a failed request
    pub async fn record_failure(&self, endpoint: &str) {
        let mut states = self.states.lock().await;
        let state = states
            .entry(endpoint.to_string())
            .or_insert(BreakerState::Closed { failure_count: 0 });

        *state = match *state {
            BreakerState::Closed { failure_count } => {
                let failure_count = failure_count + 1;
                if failure_count >= self.config.failure_threshold {
                    tracing::warn!("circuit for {endpoint} opened after {failure_count} failures");
                    BreakerState::Open {
                        opened_at: Instant::now(),
                    }
                } else {
                    BreakerState::Closed { failure_count }
                }
            }
            // A late-arriving failure while open restarts the timer
            BreakerState::Open { .. } => BreakerState::Open {
                opened_at: Instant::now(),
            },
            BreakerState::HalfOpen { .. } => {
                tracing::warn!("circuit for {endpoint} re-opened from half-open");
                BreakerState::Open {
                    opened_at: Instant::now(),
                }
            }
        };
    }

    /// Observable state of one endpoint
    pub async fn state(&self, endpoint: &str) -> BreakerState {
        let states = self.states.lock().await;
        states
            .get(endpoint)
            .copied()
            .unwrap_or(BreakerState::Closed { failure_count: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(10),
            half_open_max_attempts: 2,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_scenario() {
        // Threshold 3, timeout 10s: three failures at t0 open the circuit;
        // at t0+5s requests are denied; at t0+11s the next allow moves to
        // half-open and is permitted; a success there closes the circuit.
        let breaker = breaker();

        breaker.record_failure("mint").await;
        breaker.record_failure("mint").await;
        breaker.record_failure("mint").await;

        assert!(matches!(
            breaker.state("mint").await,
            BreakerState::Open { .. }
        ));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!breaker.allow_request("mint").await);
        assert!(matches!(
            breaker.state("mint").await,
            BreakerState::Open { .. }
        ));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(breaker.allow_request("mint").await);
        assert_eq!(
            breaker.state("mint").await,
            BreakerState::HalfOpen { remaining: 2 }
        );

        breaker.record_success("mint").await;
        assert_eq!(
            breaker.state("mint").await,
            BreakerState::Closed { failure_count: 0 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_counts_consecutive_failures() {
        let breaker = breaker();

        breaker.record_failure("mint").await;
        breaker.record_failure("mint").await;
        assert_eq!(
            breaker.state("mint").await,
            BreakerState::Closed { failure_count: 2 }
        );
        assert!(breaker.allow_request("mint").await);

        // A success resets the count
        breaker.record_success("mint").await;
        assert_eq!(
            breaker.state("mint").await,
            BreakerState::Closed { failure_count: 0 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_permits_are_metered() {
        let breaker = breaker();

        for _ in 0..3 {
            breaker.record_failure("mint").await;
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        // Trial permit plus half_open_max_attempts metered permits
        assert!(breaker.allow_request("mint").await);
        assert!(breaker.allow_request("mint").await);
        assert!(breaker.allow_request("mint").await);

        // Metered allowance exhausted
        assert!(!breaker.allow_request("mint").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breaker = breaker();

        for _ in 0..3 {
            breaker.record_failure("mint").await;
        }
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(breaker.allow_request("mint").await);

        breaker.record_failure("mint").await;
        assert!(matches!(
            breaker.state("mint").await,
            BreakerState::Open { .. }
        ));
        assert!(!breaker.allow_request("mint").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_open_resets_timer() {
        let breaker = breaker();

        for _ in 0..3 {
            breaker.record_failure("mint").await;
        }

        tokio::time::advance(Duration::from_secs(8)).await;
        // Late arrival restarts the open window
        breaker.record_failure("mint").await;

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(!breaker.allow_request("mint").await);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(breaker.allow_request("mint").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoints_are_independent() {
        let breaker = breaker();

        for _ in 0..3 {
            breaker.record_failure("mint-a").await;
        }

        assert!(!breaker.allow_request("mint-a").await);
        assert!(breaker.allow_request("mint-b").await);
    }
}
