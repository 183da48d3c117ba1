#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod client;
pub mod counter;
pub mod error;
pub mod proofs;
pub mod resilience;
pub mod secure;
pub mod seed;
pub mod session;
pub mod store;
pub mod types;
pub mod ws;

pub use cashukit;

pub use self::client::MintConnector;
pub use self::counter::CounterLedger;
pub use self::error::{Error, ErrorCategory, ErrorResponse};
pub use self::proofs::ProofManager;
pub use self::resilience::{
    CircuitBreaker, CircuitBreakerConfig, RateLimiter, RateLimiterConfig, Resilience, RetryPolicy,
};
pub use self::secure::{MemorySecureStore, SecureStore};
pub use self::session::WalletSession;
pub use self::store::{MemoryProofStore, ProofState, ProofStore};
pub use self::ws::{ReconnectPolicy, SubscriptionClient, SubscriptionClientConfig};

/// Environment variable that, when set to a mint url, activates live
/// integration tests; absent or empty means skip
pub const ENV_TEST_MINT: &str = "CASHUKIT_TEST_MINT";
