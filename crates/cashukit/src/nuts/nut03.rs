//! NUT-03: Swap
//!
//! <https://github.com/cashubtc/nuts/blob/main/03.md>

use serde::{Deserialize, Serialize};

use super::nut00::BlindSignature;
use crate::nuts::{BlindedMessage, PreMintSecrets, Proofs};
use crate::Amount;

/// Preswap information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreSwap {
    /// Premint secrets
    pub pre_mint_secrets: PreMintSecrets,
    /// Swap request
    pub swap_request: SwapRequest,
    /// Amount requested
    pub derived_secret_count: u32,
    /// Fee amount
    pub fee: Amount,
}

/// Swap Request [NUT-03]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Proofs that are to be spent in the swap
    pub inputs: Proofs,
    /// Blinded Messages for Mint to sign
    pub outputs: Vec<BlindedMessage>,
    /// Access token [NUT-22]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl SwapRequest {
    /// Create new [`SwapRequest`]
    pub fn new(inputs: Proofs, outputs: Vec<BlindedMessage>) -> Self {
        Self {
            inputs,
            outputs,
            access_token: None,
        }
    }

    /// Total value of proofs in [`SwapRequest`]
    pub fn input_amount(&self) -> Amount {
        self.inputs.iter().map(|proof| proof.amount).sum()
    }

    /// Total value of outputs in [`SwapRequest`]
    pub fn output_amount(&self) -> Amount {
        self.outputs.iter().map(|output| output.amount).sum()
    }

    /// Check the request is well formed before transmission
    pub fn validate(&self) -> bool {
        !self.inputs.is_empty() && !self.outputs.is_empty()
    }
}

/// Swap Response [NUT-03]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    /// Blind signatures (promises)
    pub signatures: Vec<BlindSignature>,
}

impl SwapResponse {
    /// Create new [`SwapResponse`]
    pub fn new(promises: Vec<BlindSignature>) -> SwapResponse {
        SwapResponse {
            signatures: promises,
        }
    }

    /// Total [`Amount`] of promises
    pub fn promises_amount(&self) -> Amount {
        self.signatures
            .iter()
            .map(|BlindSignature { amount, .. }| *amount)
            .sum()
    }

    /// Check the response is well formed after receipt
    pub fn validate(&self) -> bool {
        !self.signatures.is_empty()
    }
}
