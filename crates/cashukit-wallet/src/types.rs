//! Wallet types

use cashukit::mint_url::MintUrl;
use cashukit::nuts::{CurrencyUnit, MeltQuoteState, MintQuoteState, SecretKey};
use cashukit::util::unix_time;
use cashukit::Amount;
use serde::{Deserialize, Serialize};

/// A mint quote held by the wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintQuote {
    /// Quote id
    pub id: String,
    /// Mint url the quote was requested from
    pub mint_url: MintUrl,
    /// Amount of the quote
    pub amount: Amount,
    /// Unit of the quote
    pub unit: CurrencyUnit,
    /// Payment request to fulfil the quote
    pub request: String,
    /// Quote state
    pub state: MintQuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: u64,
    /// Secret key the quote is locked to [NUT-20]
    ///
    /// Held by the wallet only; never transmitted except as a signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<SecretKey>,
}

impl MintQuote {
    /// Whether the quote has expired
    pub fn expired(&self) -> bool {
        unix_time() >= self.expiry
    }
}

/// A melt quote held by the wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltQuote {
    /// Quote id
    pub id: String,
    /// Unit of the quote
    pub unit: CurrencyUnit,
    /// Amount that needs to be provided
    pub amount: Amount,
    /// Payment request to be paid
    pub request: String,
    /// Fee reserve required by the mint
    pub fee_reserve: Amount,
    /// Quote state
    pub state: MeltQuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: u64,
    /// Payment preimage once paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
}

impl MeltQuote {
    /// Whether the quote has expired
    pub fn expired(&self) -> bool {
        unix_time() >= self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_quote_expiry() {
        let quote = MeltQuote {
            id: "quote".to_string(),
            unit: CurrencyUnit::Sat,
            amount: Amount::from(10),
            request: "lnbc".to_string(),
            fee_reserve: Amount::from(1),
            state: MeltQuoteState::Unpaid,
            expiry: 1,
            payment_preimage: None,
        };

        assert!(quote.expired());

        let quote = MintQuote {
            id: "quote".to_string(),
            mint_url: MintUrl::from_str("https://mint.example.com").unwrap(),
            amount: Amount::from(10),
            unit: CurrencyUnit::Sat,
            request: "lnbc".to_string(),
            state: MintQuoteState::Unpaid,
            expiry: unix_time() + 60,
            secret_key: None,
        };

        assert!(!quote.expired());
    }
}
