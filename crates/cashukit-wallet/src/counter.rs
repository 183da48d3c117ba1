//! Keyset counter ledger
//!
//! Tracks the monotonically increasing derivation counter per keyset id
//! used for deterministic secrets. Counters are advanced exactly once per
//! consumed derivation; a failed mint round-trip rewinds to the
//! pre-attempt value.

use std::collections::HashMap;

use cashukit::nuts::Id;
use tokio::sync::Mutex;

/// Linearizable counter ledger keyed by keyset id
#[derive(Debug, Default)]
pub struct CounterLedger {
    counters: Mutex<HashMap<Id, u32>>,
}

impl CounterLedger {
    /// New empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger restored from a persisted snapshot
    pub fn from_snapshot(snapshot: HashMap<Id, u32>) -> Self {
        Self {
            counters: Mutex::new(snapshot),
        }
    }

    /// Current counter for a keyset; defaults to 0
    pub async fn get(&self, id: Id) -> u32 {
        *self.counters.lock().await.get(&id).unwrap_or(&0)
    }

    /// Set the counter for a keyset
    pub async fn set(&self, id: Id, value: u32) {
        self.counters.lock().await.insert(id, value);
    }

    /// Advance the counter by `count`, returning the value it had before
    ///
    /// The returned value is the first counter of the reserved range.
    pub async fn increment(&self, id: Id, count: u32) -> u32 {
        let mut counters = self.counters.lock().await;
        let current = counters.entry(id).or_insert(0);
        let start = *current;
        *current = current.saturating_add(count);
        start
    }

    /// Rewind the counter to `value`
    ///
    /// Used when a mint round-trip fails after counters were reserved.
    pub async fn rewind(&self, id: Id, value: u32) {
        self.counters.lock().await.insert(id, value);
    }

    /// Reset a keyset's counter to 0
    pub async fn reset(&self, id: Id) {
        self.counters.lock().await.remove(&id);
    }

    /// Snapshot of all counters for persistence
    pub async fn snapshot(&self) -> HashMap<Id, u32> {
        self.counters.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use super::*;

    fn keyset_id() -> Id {
        Id::from_str("009a1f293253e41e").unwrap()
    }

    #[tokio::test]
    async fn test_counter_defaults_to_zero() {
        let ledger = CounterLedger::new();
        assert_eq!(ledger.get(keyset_id()).await, 0);
    }

    #[tokio::test]
    async fn test_increment_returns_reserved_start() {
        let ledger = CounterLedger::new();

        let start = ledger.increment(keyset_id(), 3).await;
        assert_eq!(start, 0);
        assert_eq!(ledger.get(keyset_id()).await, 3);

        let start = ledger.increment(keyset_id(), 2).await;
        assert_eq!(start, 3);
        assert_eq!(ledger.get(keyset_id()).await, 5);
    }

    #[tokio::test]
    async fn test_rewind_after_failed_attempt() {
        let ledger = CounterLedger::new();
        ledger.set(keyset_id(), 7).await;

        let start = ledger.increment(keyset_id(), 4).await;
        assert_eq!(start, 7);
        assert_eq!(ledger.get(keyset_id()).await, 11);

        // Mint round-trip failed; counter returns to its pre-attempt value
        ledger.rewind(keyset_id(), start).await;
        assert_eq!(ledger.get(keyset_id()).await, 7);
    }

    #[tokio::test]
    async fn test_reset_and_snapshot() {
        let ledger = CounterLedger::new();
        ledger.set(keyset_id(), 9).await;

        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.get(&keyset_id()), Some(&9));

        ledger.reset(keyset_id()).await;
        assert_eq!(ledger.get(keyset_id()).await, 0);

        let restored = CounterLedger::from_snapshot(snapshot);
        assert_eq!(restored.get(keyset_id()).await, 9);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_are_disjoint() {
        let ledger = Arc::new(CounterLedger::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(
                async move { ledger.increment(keyset_id(), 4).await },
            ));
        }

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }

        starts.sort_unstable();
        // Every reservation begins where another ended
        for (i, start) in starts.iter().enumerate() {
            assert_eq!(*start, (i as u32) * 4);
        }

        assert_eq!(ledger.get(keyset_id()).await, 64);
    }
}
