//! In-memory proof store

use std::collections::HashMap;

use async_trait::async_trait;
use cashukit::nuts::{Id, Proof, Proofs};
use cashukit::secret::Secret;
use tokio::sync::Mutex;

use super::{ProofState, ProofStore};
use crate::error::Error;

#[derive(Debug, Default)]
struct Inner {
    unspent: HashMap<Secret, Proof>,
    pending: HashMap<Secret, Proof>,
    spent: HashMap<Secret, Proof>,
}

impl Inner {
    fn state_of(&self, secret: &Secret) -> Option<ProofState> {
        if self.unspent.contains_key(secret) {
            Some(ProofState::Unspent)
        } else if self.pending.contains_key(secret) {
            Some(ProofState::PendingSpent)
        } else if self.spent.contains_key(secret) {
            Some(ProofState::Spent)
        } else {
            None
        }
    }
}

/// Reference in-memory [`ProofStore`]
///
/// A single logical mutex backs all three state sets, which makes every
/// method linearizable.
#[derive(Debug, Default)]
pub struct MemoryProofStore {
    inner: Mutex<Inner>,
}

impl MemoryProofStore {
    /// New empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProofStore for MemoryProofStore {
    async fn store(&self, proofs: Proofs) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        for proof in proofs {
            // De-duplicate by secret: a secret already tracked in any
            // state is left untouched
            if inner.state_of(&proof.secret).is_none() {
                inner.unspent.insert(proof.secret.clone(), proof);
            }
        }

        Ok(())
    }

    async fn remove(&self, proofs: &Proofs) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        for proof in proofs {
            inner.unspent.remove(&proof.secret);
            inner.pending.remove(&proof.secret);
            inner.spent.remove(&proof.secret);
        }

        Ok(())
    }

    async fn retrieve_all(&self) -> Result<Proofs, Error> {
        let inner = self.inner.lock().await;

        Ok(inner
            .unspent
            .values()
            .chain(inner.pending.values())
            .chain(inner.spent.values())
            .cloned()
            .collect())
    }

    async fn retrieve(&self, keyset_id: Id) -> Result<Proofs, Error> {
        let inner = self.inner.lock().await;

        Ok(inner
            .unspent
            .values()
            .chain(inner.pending.values())
            .chain(inner.spent.values())
            .filter(|p| p.keyset_id == keyset_id)
            .cloned()
            .collect())
    }

    async fn mark_pending_spent(&self, proofs: &Proofs) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        // Validate before mutating so a failure leaves no partial marks
        for proof in proofs {
            match inner.state_of(&proof.secret) {
                Some(ProofState::Unspent) => {}
                Some(ProofState::PendingSpent) | Some(ProofState::Spent) => {
                    return Err(Error::ProofAlreadySpent);
                }
                None => return Err(Error::ProofNotFound),
            }
        }

        for proof in proofs {
            if let Some(proof) = inner.unspent.remove(&proof.secret) {
                inner.pending.insert(proof.secret.clone(), proof);
            }
        }

        Ok(())
    }

    async fn finalize_pending_spent(&self, proofs: &Proofs) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        for proof in proofs {
            match inner.state_of(&proof.secret) {
                Some(ProofState::PendingSpent) => {}
                Some(state) => {
                    return Err(Error::InvalidState(format!(
                        "finalize requires pending, found {state:?}"
                    )));
                }
                None => return Err(Error::ProofNotFound),
            }
        }

        for proof in proofs {
            if let Some(proof) = inner.pending.remove(&proof.secret) {
                inner.spent.insert(proof.secret.clone(), proof);
            }
        }

        Ok(())
    }

    async fn rollback_pending_spent(&self, proofs: &Proofs) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        for proof in proofs {
            match inner.state_of(&proof.secret) {
                Some(ProofState::PendingSpent) => {}
                Some(state) => {
                    return Err(Error::InvalidState(format!(
                        "rollback requires pending, found {state:?}"
                    )));
                }
                None => return Err(Error::ProofNotFound),
            }
        }

        for proof in proofs {
            if let Some(proof) = inner.pending.remove(&proof.secret) {
                inner.unspent.insert(proof.secret.clone(), proof);
            }
        }

        Ok(())
    }

    async fn get_pending_spent(&self) -> Result<Proofs, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.pending.values().cloned().collect())
    }

    async fn get_unspent(&self) -> Result<Proofs, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.unspent.values().cloned().collect())
    }

    async fn contains(&self, proof: &Proof) -> Result<bool, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.state_of(&proof.secret).is_some())
    }

    async fn state_of(&self, secret: &Secret) -> Result<Option<ProofState>, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.state_of(secret))
    }

    async fn count(&self) -> Result<usize, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.unspent.len() + inner.pending.len() + inner.spent.len())
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        inner.unspent.clear();
        inner.pending.clear();
        inner.spent.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use cashukit::nuts::PublicKey;
    use cashukit::Amount;

    use super::*;

    fn proof(amount: u64) -> Proof {
        Proof::new(
            Amount::from(amount),
            Id::from_str("009a1f293253e41e").unwrap(),
            Secret::generate(),
            PublicKey::from_str(
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_store_deduplicates_by_secret() {
        let store = MemoryProofStore::new();
        let p = proof(2);

        store.store(vec![p.clone(), p.clone()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        // Storing the same secret again is a no-op
        store.store(vec![p.clone()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.contains(&p).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = MemoryProofStore::new();
        let p = proof(2);

        store.remove(&vec![p.clone()]).await.unwrap();

        store.store(vec![p.clone()]).await.unwrap();
        store.remove(&vec![p.clone()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_state_machine_happy_path() {
        let store = MemoryProofStore::new();
        let p = proof(4);
        let proofs = vec![p.clone()];

        store.store(proofs.clone()).await.unwrap();
        assert_eq!(
            store.state_of(&p.secret).await.unwrap(),
            Some(ProofState::Unspent)
        );

        store.mark_pending_spent(&proofs).await.unwrap();
        assert_eq!(
            store.state_of(&p.secret).await.unwrap(),
            Some(ProofState::PendingSpent)
        );
        assert_eq!(store.get_pending_spent().await.unwrap().len(), 1);

        store.finalize_pending_spent(&proofs).await.unwrap();
        assert_eq!(
            store.state_of(&p.secret).await.unwrap(),
            Some(ProofState::Spent)
        );

        // Spent proofs stay tracked but are not available
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get_unspent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_returns_to_unspent() {
        let store = MemoryProofStore::new();
        let p = proof(4);
        let proofs = vec![p.clone()];

        store.store(proofs.clone()).await.unwrap();
        store.mark_pending_spent(&proofs).await.unwrap();
        store.rollback_pending_spent(&proofs).await.unwrap();

        assert_eq!(
            store.state_of(&p.secret).await.unwrap(),
            Some(ProofState::Unspent)
        );

        // It can be reserved again
        store.mark_pending_spent(&proofs).await.unwrap();
    }

    #[tokio::test]
    async fn test_illegal_transitions() {
        let store = MemoryProofStore::new();
        let p = proof(4);
        let proofs = vec![p.clone()];

        // Finalize and rollback require pending
        store.store(proofs.clone()).await.unwrap();
        assert!(store.finalize_pending_spent(&proofs).await.is_err());
        assert!(store.rollback_pending_spent(&proofs).await.is_err());

        // Pending cannot be marked again
        store.mark_pending_spent(&proofs).await.unwrap();
        assert!(matches!(
            store.mark_pending_spent(&proofs).await,
            Err(Error::ProofAlreadySpent)
        ));

        // Spent cannot re-enter pending
        store.finalize_pending_spent(&proofs).await.unwrap();
        assert!(matches!(
            store.mark_pending_spent(&proofs).await,
            Err(Error::ProofAlreadySpent)
        ));

        // Unknown proofs cannot be marked
        let unknown = vec![proof(8)];
        assert!(matches!(
            store.mark_pending_spent(&unknown).await,
            Err(Error::ProofNotFound)
        ));
    }

    #[tokio::test]
    async fn test_mark_pending_is_all_or_nothing() {
        let store = MemoryProofStore::new();
        let a = proof(2);
        let b = proof(4);

        store.store(vec![a.clone(), b.clone()]).await.unwrap();
        store.mark_pending_spent(&vec![b.clone()]).await.unwrap();

        // Batch containing an already-pending proof fails entirely
        assert!(store
            .mark_pending_spent(&vec![a.clone(), b.clone()])
            .await
            .is_err());

        // The valid member of the batch was left untouched
        assert_eq!(
            store.state_of(&a.secret).await.unwrap(),
            Some(ProofState::Unspent)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_spend_single_winner() {
        let store = Arc::new(MemoryProofStore::new());
        let p = proof(8);
        store.store(vec![p.clone()]).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let proofs = vec![p.clone()];
            handles.push(tokio::spawn(async move {
                store.mark_pending_spent(&proofs).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(Error::ProofAlreadySpent) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // Exactly one caller transitions unspent -> pending
        assert_eq!(successes, 1);
        assert_eq!(
            store.state_of(&p.secret).await.unwrap(),
            Some(ProofState::PendingSpent)
        );
    }

    #[tokio::test]
    async fn test_retrieve_by_keyset() {
        let store = MemoryProofStore::new();
        let a = proof(2);

        let other_keyset = Proof::new(
            Amount::from(4),
            Id::from_str("00ad268c4d1f5826").unwrap(),
            Secret::generate(),
            PublicKey::from_str(
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
            )
            .unwrap(),
        );

        store
            .store(vec![a.clone(), other_keyset.clone()])
            .await
            .unwrap();

        let keyset_proofs = store
            .retrieve(Id::from_str("009a1f293253e41e").unwrap())
            .await
            .unwrap();
        assert_eq!(keyset_proofs.len(), 1);
        assert_eq!(keyset_proofs[0].secret, a.secret);

        assert_eq!(store.retrieve_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_drops_all_states() {
        let store = MemoryProofStore::new();
        let a = proof(1);
        let b = proof(2);
        let c = proof(4);

        store
            .store(vec![a.clone(), b.clone(), c.clone()])
            .await
            .unwrap();
        store.mark_pending_spent(&vec![b.clone()]).await.unwrap();
        store.mark_pending_spent(&vec![c.clone()]).await.unwrap();
        store.finalize_pending_spent(&vec![c.clone()]).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.retrieve_all().await.unwrap().is_empty());
        assert_eq!(store.state_of(&c.secret).await.unwrap(), None);
    }
}
