//! Rate limiter
//!
//! Token bucket per endpoint key. The bucket state is internally
//! serialized; waiting for availability is a cooperative, cancellation
//! aware suspension.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of tokens a bucket can hold
    pub capacity: u32,
    /// Tokens replenished per second
    pub refill_per_second: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_second: 5.0,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter keyed by endpoint
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// New limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens =
            (bucket.tokens + elapsed * self.config.refill_per_second).min(self.config.capacity as f64);
        bucket.last_refill = now;
    }

    /// Whether a request would currently be allowed
    pub async fn should_allow(&self, endpoint: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        let bucket = buckets.entry(endpoint.to_string()).or_insert(Bucket {
            tokens: self.config.capacity as f64,
            last_refill: now,
        });

        self.refill(bucket, now);
        bucket.tokens >= 1.0
    }

    /// Consume a token for a request that is being sent
    pub async fn record_request(&self, endpoint: &str) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        let bucket = buckets.entry(endpoint.to_string()).or_insert(Bucket {
            tokens: self.config.capacity as f64,
            last_refill: now,
        });

        self.refill(bucket, now);
        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    /// Suspend until a token is available
    ///
    /// The suspension is cooperative: dropping the future leaves the
    /// bucket untouched.
    pub async fn wait_for_availability(&self, endpoint: &str) {
        loop {
            if self.should_allow(endpoint).await {
                return;
            }

            let wait = Duration::from_secs_f64(1.0 / self.config.refill_per_second.max(f64::MIN_POSITIVE));
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_starts_full() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            capacity: 2,
            refill_per_second: 1.0,
        });

        assert!(limiter.should_allow("mint/swap").await);
        limiter.record_request("mint/swap").await;
        assert!(limiter.should_allow("mint/swap").await);
        limiter.record_request("mint/swap").await;

        // Bucket drained
        assert!(!limiter.should_allow("mint/swap").await);
    }

    #[tokio::test]
    async fn test_buckets_are_per_endpoint() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            capacity: 1,
            refill_per_second: 1.0,
        });

        limiter.record_request("mint/swap").await;
        assert!(!limiter.should_allow("mint/swap").await);

        // A different endpoint has its own bucket
        assert!(limiter.should_allow("mint/melt").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_over_time() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            capacity: 1,
            refill_per_second: 1.0,
        });

        limiter.record_request("mint/swap").await;
        assert!(!limiter.should_allow("mint/swap").await);

        tokio::time::advance(Duration::from_secs(1)).await;

        assert!(limiter.should_allow("mint/swap").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_availability() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            capacity: 1,
            refill_per_second: 2.0,
        });

        limiter.record_request("mint/swap").await;

        let started = Instant::now();
        limiter.wait_for_availability("mint/swap").await;

        // One token refills after half a second at 2/s
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
