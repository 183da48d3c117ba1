//! Keyset fees
//!
//! <https://github.com/cashubtc/nuts/blob/main/02.md>

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use crate::nuts::Id;
use crate::Amount;

/// Fee error
#[derive(Debug, Error)]
pub enum Error {
    /// Keyset id is not known
    #[error("Keyset id not known: `{0}`")]
    KeysetNotFound(Id),
    /// Amount overflow
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
}

/// Fee required for a proof set
///
/// `total_fee = ceil(sum(input_fee_ppk * count) / 1000)`; a keyset without
/// a declared fee contributes zero parts per thousand.
#[instrument(skip_all)]
pub fn calculate_fee(
    proofs_count: &HashMap<Id, u64>,
    keyset_fee_ppk: &HashMap<Id, u64>,
) -> Result<Amount, Error> {
    let mut sum_fee: u64 = 0;

    for (keyset_id, proof_count) in proofs_count {
        let fee_ppk = keyset_fee_ppk
            .get(keyset_id)
            .ok_or(Error::KeysetNotFound(*keyset_id))?;

        let proofs_fee = fee_ppk * proof_count;

        sum_fee += proofs_fee;
    }

    let fee = (sum_fee + 999) / 1000;

    Ok(fee.into())
}

/// Check a transaction is balanced: `inputs == outputs + fee`
pub fn check_transaction_balanced(
    inputs: Amount,
    outputs: Amount,
    fee: Amount,
) -> Result<bool, Error> {
    let required = outputs.checked_add(fee).ok_or(crate::amount::Error::AmountOverflow)?;
    Ok(inputs == required)
}
