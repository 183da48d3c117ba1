//! Secret

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::rand::{self, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hex;

/// The secret data that allows spending ecash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

/// Secret Errors
#[derive(Debug, Error)]
pub enum Error {
    /// Secret is empty
    #[error("Secret is empty")]
    EmptySecret,
    /// Invalid secret length
    #[error("Invalid secret length: `{0}`")]
    InvalidLength(u64),
    /// Hex error
    #[error(transparent)]
    Hex(#[from] hex::Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl Default for Secret {
    fn default() -> Self {
        Self::generate()
    }
}

impl Secret {
    /// Create new [`Secret`]
    #[inline]
    pub fn new<S>(secret: S) -> Self
    where
        S: Into<String>,
    {
        Self(secret.into())
    }

    /// Create secret value
    ///
    /// The default secret is the hex encoding of 32 random bytes.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();

        let mut random_bytes = [0u8; 32];
        rng.fill_bytes(&mut random_bytes);

        Self(hex::encode(random_bytes))
    }

    /// [`Secret`] as bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// [`Secret`] to bytes
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone().into_bytes()
    }

    /// Check if secret is a well-known P2PK secret
    pub fn is_p2pk(&self) -> bool {
        matches!(
            crate::nuts::nut10::Secret::try_from(self).map(|s| s.kind()),
            Ok(crate::nuts::Kind::P2PK)
        )
    }

    /// Check if secret is a well-known HTLC secret
    pub fn is_htlc(&self) -> bool {
        matches!(
            crate::nuts::nut10::Secret::try_from(self).map(|s| s.kind()),
            Ok(crate::nuts::Kind::HTLC)
        )
    }
}

impl FromStr for Secret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::EmptySecret);
        }

        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Secret> for Vec<u8> {
    fn from(value: Secret) -> Vec<u8> {
        value.to_bytes()
    }
}

impl From<&Secret> for Vec<u8> {
    fn from(value: &Secret) -> Vec<u8> {
        value.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_secret_from_str() {
        let secret = Secret::generate();

        let secret_str = secret.to_string();

        assert_eq!(hex::decode(&secret_str).unwrap().len(), 32);

        let secret_n = Secret::from_str(&secret_str).unwrap();

        assert_eq!(secret_n, secret)
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(Secret::from_str("").is_err());
    }

    #[test]
    fn test_secret_kind_detection() {
        let plain = Secret::generate();
        assert!(!plain.is_p2pk());
        assert!(!plain.is_htlc());

        let p2pk = Secret::from_str(r#"["P2PK",{"nonce":"5d11913ee0f92fefdc82a6764fd2457a","data":"026562efcfadc8e86d44da6a8adf80633d974302e62c850774db1fb36ff4cc7198"}]"#).unwrap();
        assert!(p2pk.is_p2pk());
        assert!(!p2pk.is_htlc());
    }
}
