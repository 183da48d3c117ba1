//! Reconnection strategies

use std::time::Duration;

use rand::Rng;

/// Policy controlling reconnection after a lost connection
#[derive(Debug, Clone)]
pub enum ReconnectPolicy {
    /// Exponential backoff:
    /// `delay(n) = min(max_delay, initial * multiplier^(n-1)) * (1 ± jitter)`
    ExponentialBackoff {
        /// Delay before the first reconnect attempt
        initial: Duration,
        /// Upper bound on the delay
        max_delay: Duration,
        /// Growth factor per attempt
        multiplier: f64,
        /// Jitter factor in `[0, 1)`
        jitter: f64,
        /// Give up after this many attempts; `None` retries forever
        max_attempts: Option<u32>,
    },
    /// Fixed interval between attempts
    FixedInterval {
        /// Delay between attempts
        interval: Duration,
        /// Give up after this many attempts; `None` retries forever
        max_attempts: Option<u32>,
    },
    /// Never reconnect
    Never,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect `attempt` (1-indexed), or `None` when the
    /// policy has given up
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::ExponentialBackoff {
                initial,
                max_delay,
                multiplier,
                jitter,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|max| attempt > max) {
                    return None;
                }

                let exponent = attempt.saturating_sub(1).min(32);
                let raw = initial.as_secs_f64() * multiplier.powi(exponent as i32);
                let capped = raw.min(max_delay.as_secs_f64());

                let factor = if *jitter > 0.0 {
                    let mut rng = rand::rng();
                    1.0 + rng.random_range(-*jitter..=*jitter)
                } else {
                    1.0
                };

                Some(Duration::from_secs_f64((capped * factor).max(0.0)))
            }
            Self::FixedInterval {
                interval,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|max| attempt > max) {
                    return None;
                }

                Some(*interval)
            }
            Self::Never => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_growth() {
        let policy = ReconnectPolicy::ExponentialBackoff {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: None,
        };

        assert_eq!(policy.delay(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay(4), Some(Duration::from_secs(8)));
        // Capped at max_delay
        assert_eq!(policy.delay(5), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay(50), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_exponential_backoff_max_attempts() {
        let policy = ReconnectPolicy::ExponentialBackoff {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: Some(3),
        };

        assert!(policy.delay(3).is_some());
        assert!(policy.delay(4).is_none());
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = ReconnectPolicy::ExponentialBackoff {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            max_attempts: None,
        };

        for _ in 0..32 {
            let delay = policy.delay(2).unwrap();
            assert!(delay >= Duration::from_secs_f64(2.0 * 0.9));
            assert!(delay <= Duration::from_secs_f64(2.0 * 1.1));
        }
    }

    #[test]
    fn test_fixed_interval() {
        let policy = ReconnectPolicy::FixedInterval {
            interval: Duration::from_secs(5),
            max_attempts: Some(2),
        };

        assert_eq!(policy.delay(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay(2), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay(3), None);
    }

    #[test]
    fn test_never() {
        assert_eq!(ReconnectPolicy::Never.delay(1), None);
    }
}
