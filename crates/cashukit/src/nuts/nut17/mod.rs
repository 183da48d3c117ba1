//! NUT-17: WebSocket subscriptions
//!
//! <https://github.com/cashubtc/nuts/blob/main/17.md>

use serde::{Deserialize, Serialize};

use super::nut00::PaymentMethod;
use crate::nuts::{CurrencyUnit, MeltQuoteBolt11Response, MintQuoteBolt11Response, ProofState};

pub mod ws;

/// Subscription parameters
#[derive(Debug, Clone, Serialize, Eq, PartialEq, Hash, Deserialize)]
pub struct Params {
    /// Kind
    pub kind: Kind,
    /// Filters
    pub filters: Vec<String>,
    /// Subscription Id
    #[serde(rename = "subId")]
    pub id: String,
}

/// Subscription settings advertised in mint info
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedSettings {
    /// Supported methods
    pub supported: Vec<SupportedMethods>,
}

/// Supported WS methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedMethods {
    /// Payment Method
    pub method: PaymentMethod,
    /// Unit
    pub unit: CurrencyUnit,
    /// Commands
    pub commands: Vec<Kind>,
}

impl SupportedMethods {
    /// [`SupportedMethods`] for Bolt11 with all supported commands
    pub fn default_bolt11(unit: CurrencyUnit) -> Self {
        Self {
            method: PaymentMethod::Bolt11,
            unit,
            commands: vec![Kind::Bolt11MintQuote, Kind::Bolt11MeltQuote, Kind::ProofState],
        }
    }
}

/// Subscription kind
#[derive(Debug, Clone, Copy, Eq, Ord, PartialOrd, PartialEq, Hash)]
pub enum Kind {
    /// Bolt 11 Mint Quote
    Bolt11MintQuote,
    /// Bolt 11 Melt Quote
    Bolt11MeltQuote,
    /// Proof State
    ProofState,
}

impl Serialize for Kind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Kind::Bolt11MintQuote => "bolt11_mint_quote",
            Kind::Bolt11MeltQuote => "bolt11_melt_quote",
            Kind::ProofState => "proof_state",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "bolt11_mint_quote" => Ok(Kind::Bolt11MintQuote),
            "bolt11_melt_quote" => Ok(Kind::Bolt11MeltQuote),
            "proof_state" => Ok(Kind::ProofState),
            _ => Err(serde::de::Error::custom("Unknown subscription kind")),
        }
    }
}

/// Subscription notification payload, decoded on dispatch into the typed
/// sum over the three subscription kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    /// Proof State
    ProofState(ProofState),
    /// Melt Quote Bolt11 Response
    MeltQuoteBolt11Response(MeltQuoteBolt11Response),
    /// Mint Quote Bolt11 Response
    MintQuoteBolt11Response(MintQuoteBolt11Response),
}

impl From<ProofState> for NotificationPayload {
    fn from(proof_state: ProofState) -> NotificationPayload {
        NotificationPayload::ProofState(proof_state)
    }
}

impl From<MeltQuoteBolt11Response> for NotificationPayload {
    fn from(melt_quote: MeltQuoteBolt11Response) -> NotificationPayload {
        NotificationPayload::MeltQuoteBolt11Response(melt_quote)
    }
}

impl From<MintQuoteBolt11Response> for NotificationPayload {
    fn from(mint_quote: MintQuoteBolt11Response) -> NotificationPayload {
        NotificationPayload::MintQuoteBolt11Response(mint_quote)
    }
}
