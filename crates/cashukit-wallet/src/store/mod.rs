//! Proof storage
//!
//! The proof store is the sole authority for proof state. Every secret in
//! the store is in exactly one of the unspent, pending-spent or spent
//! states; pending is entered only from unspent, and left only by
//! finalizing (spent) or rolling back (unspent).

use async_trait::async_trait;
use cashukit::nuts::{Id, Proof, Proofs};
use cashukit::secret::Secret;

use crate::error::Error;

mod memory;

pub use memory::MemoryProofStore;

/// State of a proof within the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofState {
    /// Available to spend
    Unspent,
    /// Reserved by an in-flight transaction
    PendingSpent,
    /// Consumed by a finalized transaction
    Spent,
}

/// Storage of proofs and their spend state
///
/// All methods are linearizable: under concurrent writers the final state
/// is determined by a total order consistent with happens-before, and
/// `mark_pending_spent` is the single linearization point for spend
/// attempts on a secret.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Add proofs, keyed by secret; duplicates are silently de-duplicated
    async fn store(&self, proofs: Proofs) -> Result<(), Error>;

    /// Remove proofs by secret; missing entries are a no-op
    async fn remove(&self, proofs: &Proofs) -> Result<(), Error>;

    /// All stored proofs irrespective of state
    async fn retrieve_all(&self) -> Result<Proofs, Error>;

    /// Stored proofs of one keyset irrespective of state
    async fn retrieve(&self, keyset_id: Id) -> Result<Proofs, Error>;

    /// Transition proofs from unspent to pending-spent
    ///
    /// All-or-nothing: if any proof is not currently unspent the whole
    /// call fails and no state changes. Exactly one of any set of
    /// concurrent calls for the same secret succeeds.
    async fn mark_pending_spent(&self, proofs: &Proofs) -> Result<(), Error>;

    /// Transition proofs from pending-spent to spent
    async fn finalize_pending_spent(&self, proofs: &Proofs) -> Result<(), Error>;

    /// Transition proofs from pending-spent back to unspent
    async fn rollback_pending_spent(&self, proofs: &Proofs) -> Result<(), Error>;

    /// Proofs currently pending-spent
    async fn get_pending_spent(&self) -> Result<Proofs, Error>;

    /// Proofs currently unspent
    async fn get_unspent(&self) -> Result<Proofs, Error>;

    /// Membership by secret, irrespective of state
    async fn contains(&self, proof: &Proof) -> Result<bool, Error>;

    /// State of a secret, if stored
    async fn state_of(&self, secret: &Secret) -> Result<Option<ProofState>, Error>;

    /// Number of stored proofs across all states
    async fn count(&self) -> Result<usize, Error>;

    /// Drop all state, including the pending and spent sets
    async fn clear(&self) -> Result<(), Error>;
}
