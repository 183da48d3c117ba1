//! NUT-01: Mint public key exchange
//!
//! <https://github.com/cashubtc/nuts/blob/main/01.md>

use std::collections::BTreeMap;

use bitcoin::secp256k1;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

mod public_key;
mod secret_key;

pub use self::public_key::PublicKey;
pub use self::secret_key::SecretKey;
use super::nut02::KeySet;
use crate::amount::Amount;

/// NUT01 Error
#[derive(Debug, Error)]
pub enum Error {
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Invalid public key size
    #[error("Invalid public key size: expected={expected}, found={found}")]
    InvalidPublicKeySize {
        /// Expected size
        expected: usize,
        /// Actual size
        found: usize,
    },
}

/// Mint keys: a map of amount to the mint public key for that amount
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Keys(BTreeMap<Amount, PublicKey>);

impl Keys {
    /// Create new [`Keys`]
    #[inline]
    pub fn new(keys: BTreeMap<Amount, PublicKey>) -> Self {
        Self(keys)
    }

    /// Get the public key for an amount
    #[inline]
    pub fn amount_key(&self, amount: Amount) -> Option<PublicKey> {
        self.0.get(&amount).copied()
    }

    /// Iterate through the (`Amount`, `PublicKey`) entries in the map
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&Amount, &PublicKey)> {
        self.0.iter()
    }

    /// Number of keys
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// If there are no keys
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mint public keys per keyset [NUT-01]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeysResponse {
    /// Keysets with their keys
    pub keysets: Vec<KeySet>,
}

impl<'de> Deserialize<'de> for KeysResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keys_response: Value = Value::deserialize(deserializer)?;

        let keysets = keys_response
            .get("keysets")
            .ok_or(de::Error::custom("Keysets not found"))?
            .as_array()
            .ok_or(de::Error::custom("Keysets not found"))?;

        // Entries the wallet cannot decode (e.g. future keyset versions) are
        // skipped rather than failing the whole response
        let keysets = keysets
            .iter()
            .flat_map(|keyset| serde_json::from_value(keyset.clone()))
            .collect();

        Ok(KeysResponse { keysets })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn pubkey() {
        let pubkey_str = "02c020067db727d586bc3183aecf97fcb800c3f4cc4759f69c626c9db5d8f5b5d4";
        let pubkey = PublicKey::from_str(pubkey_str).unwrap();
        assert_eq!(pubkey_str, pubkey.to_string());
    }

    #[test]
    fn test_ser_der_secret() {
        let secret = SecretKey::generate();

        let json = serde_json::to_string(&secret).unwrap();

        let sec: SecretKey = serde_json::from_str(&json).unwrap();

        assert_eq!(sec, secret);
    }

    #[test]
    fn key_map_round_trip() {
        let res: String = r#"{"1":"02f71e2d93aa95fc52b938735a24774ad926406c81e9dc9d2aa699fb89281548fd","2":"03b28dd9c19aaf1ec847be31b60c6a5e1a6cb6f87434afcdb0d9348ba0e2bdb150","4":"03ede0e704e223e764a82f73984b0fec0fdbde15ef57b4de95b527f7182af7487e","8":"020fd24fbd552445df70c244be2af77da2b2f634ccfda9e9620b347b5cd50dbdd8"}"#.to_string();

        let response: Keys = serde_json::from_str(&res).unwrap();

        assert_eq!(&serde_json::to_string(&response).unwrap(), &res)
    }

    #[test]
    fn test_keys_with_invalid_pubkey_rejected() {
        // Second entry is truncated
        let invalid = r#"{
  "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38","2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de"
}"#;

        let response: Result<Keys, serde_json::Error> = serde_json::from_str(invalid);
        assert!(response.is_err());

        // Uncompressed key
        let invalid = r#"{
  "1":"04fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de3625246cb2c27dac965cb7200a5986467eee92eb7d496bbf1453b074e223e481"
}"#;
        let response: Result<Keys, serde_json::Error> = serde_json::from_str(invalid);
        assert!(response.is_err());
    }
}
