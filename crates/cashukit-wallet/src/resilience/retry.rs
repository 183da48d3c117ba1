//! Retry policy

use std::time::Duration;

use rand::Rng;

/// Retry policy with exponential backoff and jitter
///
/// The delay before attempt `n + 1` is
/// `base_delay * 2^(n - 1) * (1 ± jitter)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay before the first retry
    pub base_delay: Duration,
    /// Jitter factor in `[0, 1)` applied to every delay
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after a failed `attempt` (1-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.base_delay.as_secs_f64() * 2_f64.powi(exponent as i32);

        let factor = if self.jitter > 0.0 {
            let mut rng = rand::rng();
            1.0 + rng.random_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };

        Duration::from_secs_f64((base * factor).max(0.0))
    }
}
