//! NUT-05: Melting Tokens
//!
//! <https://github.com/cashubtc/nuts/blob/main/05.md>

use std::fmt;
use std::str::FromStr;

use lightning_invoice::Bolt11Invoice;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::nut00::{BlindSignature, BlindedMessage, CurrencyUnit, PaymentMethod, Proofs};
use crate::util::unix_time;
use crate::Amount;

/// NUT05 Error
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown Quote State
    #[error("Unknown quote state")]
    UnknownState,
}

/// Melt quote request [NUT-05]
///
/// The bolt11 invoice is parsed on construction; this is the minimal
/// invoice shape check the wallet performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Request {
    /// Bolt11 invoice to be paid
    pub request: Bolt11Invoice,
    /// Unit wallet would like to pay with
    pub unit: CurrencyUnit,
}

impl MeltQuoteBolt11Request {
    /// Check the request is well formed before transmission
    pub fn validate(&self) -> bool {
        // An amountless invoice cannot be melted
        self.request.amount_milli_satoshis().is_some()
    }
}

/// Possible states of a melt quote
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteState {
    /// Quote has not been paid
    #[default]
    Unpaid,
    /// Paying is in progress
    Pending,
    /// Quote has been paid
    Paid,
}

impl fmt::Display for QuoteState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
        }
    }
}

impl FromStr for QuoteState {
    type Err = Error;

    fn from_str(state: &str) -> Result<Self, Self::Err> {
        match state {
            "UNPAID" => Ok(Self::Unpaid),
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            _ => Err(Error::UnknownState),
        }
    }
}

/// Melt quote response [NUT-05]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Response {
    /// Quote Id
    pub quote: String,
    /// The amount that needs to be provided
    pub amount: Amount,
    /// The fee reserve that is required
    pub fee_reserve: Amount,
    /// Quote State
    pub state: QuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: u64,
    /// Payment preimage, available once the quote is paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
    /// Change returned for overpaid melt inputs [NUT-08]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Vec<BlindSignature>>,
}

impl MeltQuoteBolt11Response {
    /// A quote in a final state will never transition again
    pub fn is_final(&self) -> bool {
        self.state == QuoteState::Paid
    }

    /// Whether the quote can currently be paid
    pub fn can_pay(&self) -> bool {
        self.state == QuoteState::Unpaid && !self.expired(unix_time())
    }

    /// Whether the quote has expired at `now`
    ///
    /// A quote expiring this exact second is no longer payable.
    pub fn expired(&self, now: u64) -> bool {
        now >= self.expiry
    }

    /// Check the response is well formed after receipt
    pub fn validate(&self) -> bool {
        !self.quote.is_empty()
    }
}

/// Melt request [NUT-05]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltRequest {
    /// Quote ID
    pub quote: String,
    /// Proofs to melt
    pub inputs: Proofs,
    /// Blinded messages for fee return change [NUT-08]
    ///
    /// Amount field of these blinded messages `SHOULD` be zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<BlindedMessage>>,
    /// Access token [NUT-22]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl MeltRequest {
    /// Create new [`MeltRequest`]
    pub fn new(quote: String, inputs: Proofs, outputs: Option<Vec<BlindedMessage>>) -> Self {
        Self {
            quote,
            inputs,
            outputs,
            access_token: None,
        }
    }

    /// Total value of the input proofs
    pub fn proofs_amount(&self) -> Amount {
        self.inputs.iter().map(|proof| proof.amount).sum()
    }

    /// Check the request is well formed before transmission
    pub fn validate(&self) -> bool {
        !self.quote.is_empty() && !self.inputs.is_empty()
    }
}

/// Melt Method Settings
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeltMethodSettings {
    /// Payment Method e.g. bolt11
    pub method: PaymentMethod,
    /// Currency Unit e.g. sat
    pub unit: CurrencyUnit,
    /// Min Amount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Amount>,
    /// Max Amount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Amount>,
}

/// Melt Settings
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    /// Methods to melt
    pub methods: Vec<MeltMethodSettings>,
    /// Melting disabled
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_state_round_trip() {
        for state in [QuoteState::Unpaid, QuoteState::Pending, QuoteState::Paid] {
            let s = state.to_string();
            assert_eq!(QuoteState::from_str(&s).unwrap(), state);
        }

        assert!(QuoteState::from_str("ISSUED").is_err());
    }

    fn quote(state: QuoteState, expiry: u64) -> MeltQuoteBolt11Response {
        MeltQuoteBolt11Response {
            quote: "quote-id".to_string(),
            amount: Amount::from(10),
            fee_reserve: Amount::from(1),
            state,
            expiry,
            payment_preimage: None,
            change: None,
        }
    }

    #[test]
    fn test_is_final_and_can_pay() {
        let future = unix_time() + 3600;

        let unpaid = quote(QuoteState::Unpaid, future);
        assert!(!unpaid.is_final());
        assert!(unpaid.can_pay());

        let pending = quote(QuoteState::Pending, future);
        assert!(!pending.is_final());
        assert!(!pending.can_pay());

        let paid = quote(QuoteState::Paid, future);
        assert!(paid.is_final());
        assert!(!paid.can_pay());
    }

    #[test]
    fn test_expired_quote_cannot_pay() {
        let expired = quote(QuoteState::Unpaid, 1);
        assert!(!expired.can_pay());

        // Expiry at this exact second is no longer payable
        let now = unix_time();
        let boundary = quote(QuoteState::Unpaid, now);
        assert!(boundary.expired(now));
    }

    #[test]
    fn test_melt_quote_response_deserialization() {
        let json = r#"{"quote":"TRFjoAB","amount":10,"fee_reserve":2,"state":"UNPAID","expiry":1701704757}"#;
        let response: MeltQuoteBolt11Response = serde_json::from_str(json).unwrap();

        assert_eq!(response.amount, Amount::from(10));
        assert_eq!(response.fee_reserve, Amount::from(2));
        assert_eq!(response.state, QuoteState::Unpaid);
    }
}
