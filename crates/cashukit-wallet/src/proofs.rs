//! Proof manager
//!
//! Validation on insertion, the proof-selection planner and balance
//! queries, backed by a [`ProofStore`].

use std::collections::HashMap;
use std::sync::Arc;

use cashukit::fees::calculate_fee;
use cashukit::nuts::{Id, Proof, Proofs, ProofsMethods};
use cashukit::Amount;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::store::ProofStore;

/// Manager over a [`ProofStore`]
///
/// The store remains the sole authority for proof state; the manager adds
/// validation, selection and fee accounting on top of it.
#[derive(Clone)]
pub struct ProofManager {
    store: Arc<dyn ProofStore>,
    keyset_fees: Arc<RwLock<HashMap<Id, u64>>>,
}

impl std::fmt::Debug for ProofManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofManager").finish_non_exhaustive()
    }
}

impl ProofManager {
    /// New manager over a store
    pub fn new(store: Arc<dyn ProofStore>) -> Self {
        Self {
            store,
            keyset_fees: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn ProofStore> {
        &self.store
    }

    /// Record the input fee for a keyset, in parts per thousand
    pub async fn set_keyset_fee(&self, keyset_id: Id, input_fee_ppk: u64) {
        self.keyset_fees.write().await.insert(keyset_id, input_fee_ppk);
    }

    /// Validate a single proof
    ///
    /// The signature point is decodable by construction of
    /// [`cashukit::nuts::PublicKey`]; what remains is the amount, the
    /// secret and duplication against the store.
    pub async fn validate_proof(&self, proof: &Proof) -> Result<(), Error> {
        if proof.amount == Amount::ZERO {
            return Err(Error::InvalidAmount);
        }

        if proof.secret.as_bytes().is_empty() {
            return Err(Error::InvalidSecret);
        }

        if self.store.contains(proof).await? {
            return Err(Error::DuplicateProof);
        }

        Ok(())
    }

    /// Validate and insert proofs
    pub async fn add_proofs(&self, proofs: Proofs) -> Result<(), Error> {
        for proof in &proofs {
            self.validate_proof(proof).await?;
        }

        self.store.store(proofs).await
    }

    /// Select the smallest-count subset of available proofs summing to at
    /// least `amount`
    ///
    /// Pending and spent proofs are unavailable. An exact-sum subset is
    /// preferred when one exists; otherwise the overshoot is minimized
    /// within the smallest possible count.
    pub async fn select_proofs(
        &self,
        amount: Amount,
        keyset_id: Option<Id>,
    ) -> Result<Proofs, Error> {
        if amount == Amount::ZERO {
            return Err(Error::InvalidAmount);
        }

        let mut candidates: Proofs = self
            .store
            .get_unspent()
            .await?
            .into_iter()
            .filter(|p| keyset_id.map_or(true, |id| p.keyset_id == id))
            .collect();

        if candidates.is_empty() {
            return Err(Error::NoSpendableProofs);
        }

        let total = candidates.total_amount()?;
        if total < amount {
            return Err(Error::BalanceInsufficient);
        }

        // Largest first
        candidates.sort_by(|a, b| b.amount.cmp(&a.amount));

        // Exact-sum pass: greedy take of any coin that still fits. Over
        // power-of-two denominations this finds an exact subset whenever
        // one exists.
        let mut exact = Vec::new();
        let mut remaining = amount;
        for proof in &candidates {
            if proof.amount <= remaining {
                remaining -= proof.amount;
                exact.push(proof.clone());
                if remaining == Amount::ZERO {
                    return Ok(exact);
                }
            }
        }

        // Minimal-overshoot pass: the k largest coins maximize the sum for
        // any count k, so taking largest-first until covered yields the
        // smallest possible count.
        let mut selected: Proofs = Vec::new();
        let mut acc = Amount::ZERO;
        for proof in &candidates {
            selected.push(proof.clone());
            acc += proof.amount;
            if acc >= amount {
                break;
            }
        }

        // Within that count, swapping the last coin for the smallest coin
        // that still covers reduces the overshoot.
        if let Some(last) = selected.pop() {
            let covered_without_last = acc - last.amount;
            let needed = amount - covered_without_last.min(amount);

            let replacement = candidates
                .iter()
                .rev()
                .find(|p| {
                    p.amount >= needed && !selected.iter().any(|s| s.secret == p.secret)
                })
                .cloned()
                .unwrap_or(last);

            selected.push(replacement);
        }

        Ok(selected)
    }

    /// Total balance of available proofs
    pub async fn total_balance(&self) -> Result<Amount, Error> {
        Ok(self.store.get_unspent().await?.total_amount()?)
    }

    /// Balance of available proofs in one keyset
    pub async fn balance(&self, keyset_id: Id) -> Result<Amount, Error> {
        Ok(Amount::try_sum(
            self.store
                .get_unspent()
                .await?
                .into_iter()
                .filter(|p| p.keyset_id == keyset_id)
                .map(|p| p.amount),
        )?)
    }

    /// Fee owed when spending `proofs`, per the keyset fee table
    pub async fn fee_for(&self, proofs: &Proofs) -> Result<Amount, Error> {
        let counts = proofs.count_by_keyset();
        let fees = self.keyset_fees.read().await.clone();

        Ok(calculate_fee(&counts, &fees)?)
    }
}
