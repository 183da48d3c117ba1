//! Cashu Token
//!
//! <https://github.com/cashubtc/nuts/blob/main/00.md>

use std::fmt;
use std::str::FromStr;

use bitcoin::base64::engine::{general_purpose, GeneralPurpose};
use bitcoin::base64::{alphabet, Engine as _};
use serde::{Deserialize, Serialize};

use super::{Error, Proof, Proofs, Witness};
use crate::mint_url::MintUrl;
use crate::nuts::{CurrencyUnit, Id};
use crate::secret::Secret;
use crate::Amount;

/// An optional URI scheme may wrap the serialized token
const URI_PREFIX: &str = "cashu:";

fn base64_decode(s: &str) -> Result<Vec<u8>, Error> {
    // Padding is accepted on input but never emitted
    let decode_config = general_purpose::GeneralPurposeConfig::new()
        .with_decode_padding_mode(bitcoin::base64::engine::DecodePaddingMode::Indifferent);
    Ok(GeneralPurpose::new(&alphabet::URL_SAFE, decode_config).decode(s)?)
}

fn base64_encode(data: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Token Enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// Token V3
    TokenV3(TokenV3),
    /// Token V4
    TokenV4(TokenV4),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::TokenV3(token) => token.to_string(),
            Self::TokenV4(token) => token.to_string(),
        };

        write!(f, "{token}")
    }
}

impl Token {
    /// Create new [`Token`] in the V4 format for a single mint
    pub fn new(
        mint_url: MintUrl,
        proofs: Proofs,
        memo: Option<String>,
        unit: CurrencyUnit,
    ) -> Self {
        Token::TokenV4(TokenV4 {
            token: vec![TokenV4Entry::new(mint_url, proofs)],
            unit,
            memo,
        })
    }

    /// Proofs in [`Token`]
    pub fn proofs(&self) -> Result<Proofs, Error> {
        match self {
            Self::TokenV3(token) => token.proofs(),
            Self::TokenV4(token) => token.proofs(),
        }
    }

    /// Total value of [`Token`]
    pub fn value(&self) -> Result<Amount, Error> {
        match self {
            Self::TokenV3(token) => token.value(),
            Self::TokenV4(token) => token.value(),
        }
    }

    /// [`Token`] memo
    pub fn memo(&self) -> &Option<String> {
        match self {
            Self::TokenV3(token) => token.memo(),
            Self::TokenV4(token) => token.memo(),
        }
    }

    /// Unit
    pub fn unit(&self) -> Option<CurrencyUnit> {
        match self {
            Self::TokenV3(token) => token.unit().clone(),
            Self::TokenV4(token) => Some(token.unit().clone()),
        }
    }

    /// Mint urls, in token order
    pub fn mint_urls(&self) -> Vec<MintUrl> {
        match self {
            Self::TokenV3(token) => token.mint_urls(),
            Self::TokenV4(token) => token.mint_urls(),
        }
    }

    /// Reject structurally invalid tokens: zero mint entries or an entry
    /// with zero proofs
    fn verify_structure(&self) -> Result<(), Error> {
        let empty = match self {
            Self::TokenV3(token) => {
                token.token.is_empty() || token.token.iter().any(|t| t.proofs.is_empty())
            }
            Self::TokenV4(token) => {
                token.token.is_empty() || token.token.iter().any(|t| t.proofs.is_empty())
            }
        };

        if empty {
            return Err(Error::ProofsRequired);
        }

        Ok(())
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(URI_PREFIX).unwrap_or(s);

        let (is_v3, s) = match (s.strip_prefix("cashuA"), s.strip_prefix("cashuB")) {
            (Some(s), None) => (true, s),
            (None, Some(s)) => (false, s),
            _ => return Err(Error::UnsupportedToken),
        };

        let decoded = base64_decode(s)?;

        let token = match is_v3 {
            true => {
                let decoded_str = String::from_utf8(decoded)?;
                Token::TokenV3(serde_json::from_str(&decoded_str)?)
            }
            false => Token::TokenV4(ciborium::from_reader(&decoded[..])?),
        };

        token.verify_structure()?;

        Ok(token)
    }
}

/// Token V3 entry: the proofs of one mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3Token {
    /// Url of mint
    pub mint: MintUrl,
    /// Proofs
    pub proofs: Proofs,
}

impl TokenV3Token {
    /// Create new [`TokenV3Token`]
    pub fn new(mint_url: MintUrl, proofs: Proofs) -> Self {
        Self {
            mint: mint_url,
            proofs,
        }
    }
}

/// Token V3: `cashuA` + base64url(JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3 {
    /// Proofs in [`Token`] by mint
    pub token: Vec<TokenV3Token>,
    /// Token unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<CurrencyUnit>,
    /// Memo for token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TokenV3 {
    /// Create new [`TokenV3`]
    pub fn new(
        mint_url: MintUrl,
        proofs: Proofs,
        memo: Option<String>,
        unit: Option<CurrencyUnit>,
    ) -> Result<Self, Error> {
        if proofs.is_empty() {
            return Err(Error::ProofsRequired);
        }

        Ok(Self {
            token: vec![TokenV3Token::new(mint_url, proofs)],
            unit,
            memo,
        })
    }

    /// Proofs
    pub fn proofs(&self) -> Result<Proofs, Error> {
        Ok(self
            .token
            .iter()
            .flat_map(|t| t.proofs.clone())
            .collect())
    }

    /// Total value; errors if duplicate proofs are found
    pub fn value(&self) -> Result<Amount, Error> {
        let proofs = self.proofs()?;
        let unique_count = proofs
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len();

        if unique_count != proofs.len() {
            return Err(Error::DuplicateProofs);
        }

        Ok(Amount::try_sum(proofs.iter().map(|p| p.amount))?)
    }

    /// Memo
    #[inline]
    pub fn memo(&self) -> &Option<String> {
        &self.memo
    }

    /// Unit
    #[inline]
    pub fn unit(&self) -> &Option<CurrencyUnit> {
        &self.unit
    }

    /// Mint urls, in token order
    pub fn mint_urls(&self) -> Vec<MintUrl> {
        self.token.iter().map(|t| t.mint.clone()).collect()
    }
}

impl FromStr for TokenV3 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(URI_PREFIX).unwrap_or(s);
        let s = s.strip_prefix("cashuA").ok_or(Error::UnsupportedToken)?;

        let decoded = base64_decode(s)?;
        let decoded_str = String::from_utf8(decoded)?;
        let token: TokenV3 = serde_json::from_str(&decoded_str)?;
        Ok(token)
    }
}

impl fmt::Display for TokenV3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json_string = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        let encoded = base64_encode(json_string.as_bytes());
        write!(f, "cashuA{encoded}")
    }
}

impl TryFrom<TokenV4> for TokenV3 {
    type Error = Error;

    fn try_from(token: TokenV4) -> Result<Self, Error> {
        let entries = token
            .token
            .into_iter()
            .map(|entry| {
                let proofs = entry
                    .proofs
                    .into_iter()
                    .map(ProofV4::into_proof)
                    .collect::<Result<Proofs, Error>>()?;

                Ok(TokenV3Token {
                    mint: entry.mint,
                    proofs,
                })
            })
            .collect::<Result<Vec<TokenV3Token>, Error>>()?;

        Ok(TokenV3 {
            token: entries,
            memo: token.memo,
            unit: Some(token.unit),
        })
    }
}

/// Token V4: `cashuB` + base64url(CBOR)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4 {
    /// Per-mint entries
    #[serde(rename = "t")]
    pub token: Vec<TokenV4Entry>,
    /// Token unit
    #[serde(rename = "u")]
    pub unit: CurrencyUnit,
    /// Memo for token
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TokenV4 {
    /// Proofs from token
    pub fn proofs(&self) -> Result<Proofs, Error> {
        self.token
            .iter()
            .flat_map(|t| t.proofs.iter())
            .map(|p| p.clone().into_proof())
            .collect()
    }

    /// Total value; errors if duplicate proofs are found
    pub fn value(&self) -> Result<Amount, Error> {
        let proofs: Vec<&ProofV4> = self.token.iter().flat_map(|t| t.proofs.iter()).collect();
        let unique_count = proofs
            .iter()
            .map(|p| &p.secret)
            .collect::<std::collections::HashSet<_>>()
            .len();

        if unique_count != proofs.len() {
            return Err(Error::DuplicateProofs);
        }

        Ok(Amount::try_sum(proofs.iter().map(|p| p.amount))?)
    }

    /// Memo
    #[inline]
    pub fn memo(&self) -> &Option<String> {
        &self.memo
    }

    /// Unit
    #[inline]
    pub fn unit(&self) -> &CurrencyUnit {
        &self.unit
    }

    /// Mint urls, in token order
    pub fn mint_urls(&self) -> Vec<MintUrl> {
        self.token.iter().map(|t| t.mint.clone()).collect()
    }
}

impl fmt::Display for TokenV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::ser::Error;
        let mut data = Vec::new();
        ciborium::into_writer(self, &mut data).map_err(|e| fmt::Error::custom(e.to_string()))?;
        let encoded = base64_encode(&data);
        write!(f, "cashuB{encoded}")
    }
}

impl FromStr for TokenV4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(URI_PREFIX).unwrap_or(s);
        let s = s.strip_prefix("cashuB").ok_or(Error::UnsupportedToken)?;

        let decoded = base64_decode(s)?;
        let token: TokenV4 = ciborium::from_reader(&decoded[..])?;
        Ok(token)
    }
}

impl From<TokenV3> for TokenV4 {
    fn from(token: TokenV3) -> Self {
        let entries = token
            .token
            .into_iter()
            .map(|t| TokenV4Entry::new(t.mint, t.proofs))
            .collect();

        TokenV4 {
            token: entries,
            memo: token.memo,
            unit: token.unit.unwrap_or_default(),
        }
    }
}

/// Token V4 per-mint entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4Entry {
    /// Url of mint
    #[serde(rename = "m")]
    pub mint: MintUrl,
    /// Proofs
    #[serde(rename = "p")]
    pub proofs: Vec<ProofV4>,
}

impl TokenV4Entry {
    /// Create new [`TokenV4Entry`]
    pub fn new(mint_url: MintUrl, proofs: Proofs) -> Self {
        Self {
            mint: mint_url,
            proofs: proofs.into_iter().map(ProofV4::from).collect(),
        }
    }
}

/// Proof V4: compact CBOR representation of a [`Proof`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofV4 {
    /// Amount
    #[serde(rename = "a")]
    pub amount: Amount,
    /// Secret message
    #[serde(rename = "s")]
    pub secret: Secret,
    /// Unblinded signature, as its raw 33 bytes
    #[serde(
        rename = "c",
        serialize_with = "serialize_v4_pubkey",
        deserialize_with = "deserialize_v4_pubkey"
    )]
    pub c: crate::nuts::PublicKey,
    /// Keyset id, as its raw 8 bytes
    #[serde(
        rename = "i",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_v4_keyset_id",
        deserialize_with = "deserialize_v4_keyset_id"
    )]
    pub keyset_id: Option<Id>,
    /// Witness
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

impl ProofV4 {
    /// [`ProofV4`] into [`Proof`]
    ///
    /// Errors when the entry does not carry its keyset id.
    fn into_proof(self) -> Result<Proof, Error> {
        Ok(Proof {
            amount: self.amount,
            keyset_id: self.keyset_id.ok_or(Error::UnsupportedToken)?,
            secret: self.secret,
            c: self.c,
            witness: self.witness,
        })
    }
}

impl From<Proof> for ProofV4 {
    fn from(proof: Proof) -> ProofV4 {
        let Proof {
            amount,
            keyset_id,
            secret,
            c,
            witness,
        } = proof;
        ProofV4 {
            amount,
            secret,
            c,
            keyset_id: Some(keyset_id),
            witness,
        }
    }
}

fn serialize_v4_pubkey<S>(key: &crate::nuts::PublicKey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bytes(&key.to_bytes())
}

fn deserialize_v4_pubkey<'de, D>(deserializer: D) -> Result<crate::nuts::PublicKey, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bytes = Vec::<u8>::deserialize(deserializer)?;
    crate::nuts::PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
}

fn serialize_v4_keyset_id<S>(keyset_id: &Option<Id>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match keyset_id {
        Some(id) => serializer.serialize_bytes(&id.to_bytes()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_v4_keyset_id<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bytes = Vec::<u8>::deserialize(deserializer)?;
    Id::from_bytes(&bytes)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::dhke::hash_to_curve;

    // The canonical NUT-00 example token: two proofs of amounts 2 and 8
    // from https://8333.space:3338, unit sat, memo "Thank you."
    const CANONICAL_V3: &str = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vODMzMy5zcGFjZTozMzM4IiwicHJvb2ZzIjpbeyJhbW91bnQiOjIsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6IjQwNzkxNWJjMjEyYmU2MWE3N2UzZTZkMmFlYjRjNzI3OTgwYmRhNTFjZDA2YTZhZmMyOWUyODYxNzY4YTc4MzciLCJDIjoiMDJiYzkwOTc5OTdkODFhZmIyY2M3MzQ2YjVlNDM0NWE5MzQ2YmQyYTUwNmViNzk1ODU5OGE3MmYwY2Y4NTE2M2VhIn0seyJhbW91bnQiOjgsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6ImZlMTUxMDkzMTRlNjFkNzc1NmIwZjhlZTBmMjNhNjI0YWNhYTNmNGUwNDJmNjE0MzNjNzI4YzcwNTdiOTMxYmUiLCJDIjoiMDI5ZThlNTA1MGI4OTBhN2Q2YzA5NjhkYjE2YmMxZDVkNWZhMDQwZWExZGUyODRmNmVjNjlkNjEyOTlmNjcxMDU5In1dfV0sInVuaXQiOiJzYXQiLCJtZW1vIjoiVGhhbmsgeW91LiJ9";

    #[test]
    fn test_canonical_token_decode() {
        let token = TokenV3::from_str(CANONICAL_V3).unwrap();

        assert_eq!(
            token.token[0].mint,
            MintUrl::from_str("https://8333.space:3338").unwrap()
        );
        assert_eq!(
            token.token[0].proofs[0].keyset_id,
            Id::from_str("009a1f293253e41e").unwrap()
        );
        assert_eq!(token.unit.clone().unwrap(), CurrencyUnit::Sat);
        assert_eq!(token.memo.clone().unwrap(), "Thank you.");
        assert_eq!(token.value().unwrap(), Amount::from(10));

        let amounts: Vec<u64> = token.token[0]
            .proofs
            .iter()
            .map(|p| p.amount.into())
            .collect();
        assert_eq!(amounts, vec![2, 8]);
    }

    #[test]
    fn test_canonical_token_reserialize_byte_equal() {
        let token = TokenV3::from_str(CANONICAL_V3).unwrap();

        // Byte-equal modulo optional base64 padding
        let encoded = token.to_string();
        assert_eq!(
            encoded.trim_end_matches('='),
            CANONICAL_V3.trim_end_matches('=')
        );
    }

    #[test]
    fn test_token_padding_indifferent() {
        let with_padding = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vODMzMy5zcGFjZTozMzM4IiwicHJvb2ZzIjpbeyJhbW91bnQiOjIsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6IjQwNzkxNWJjMjEyYmU2MWE3N2UzZTZkMmFlYjRjNzI3OTgwYmRhNTFjZDA2YTZhZmMyOWUyODYxNzY4YTc4MzciLCJDIjoiMDJiYzkwOTc5OTdkODFhZmIyY2M3MzQ2YjVlNDM0NWE5MzQ2YmQyYTUwNmViNzk1ODU5OGE3MmYwY2Y4NTE2M2VhIn0seyJhbW91bnQiOjgsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6ImZlMTUxMDkzMTRlNjFkNzc1NmIwZjhlZTBmMjNhNjI0YWNhYTNmNGUwNDJmNjE0MzNjNzI4YzcwNTdiOTMxYmUiLCJDIjoiMDI5ZThlNTA1MGI4OTBhN2Q2YzA5NjhkYjE2YmMxZDVkNWZhMDQwZWExZGUyODRmNmVjNjlkNjEyOTlmNjcxMDU5In1dfV0sInVuaXQiOiJzYXQiLCJtZW1vIjoiVGhhbmsgeW91IHZlcnkgbXVjaC4ifQ==";
        let without_padding = &with_padding[..with_padding.len() - 2];

        let token = TokenV3::from_str(with_padding).unwrap();
        let token_without = TokenV3::from_str(without_padding).unwrap();

        assert_eq!(token, token_without);
    }

    #[test]
    fn test_uri_prefix_stripped() {
        let token = Token::from_str(CANONICAL_V3).unwrap();
        let with_uri = format!("cashu:{CANONICAL_V3}");
        let token_from_uri = Token::from_str(&with_uri).unwrap();

        assert_eq!(token, token_from_uri);
    }

    #[test]
    fn test_token_v4_round_trip() {
        let token = Token::from_str(CANONICAL_V3).unwrap();
        let proofs = token.proofs().unwrap();

        let v4 = Token::new(
            MintUrl::from_str("https://8333.space:3338").unwrap(),
            proofs.clone(),
            Some("Thank you.".to_string()),
            CurrencyUnit::Sat,
        );

        let encoded = v4.to_string();
        assert!(encoded.starts_with("cashuB"));

        let decoded = Token::from_str(&encoded).unwrap();
        assert_eq!(decoded, v4);
        assert_eq!(decoded.proofs().unwrap(), proofs);
        assert_eq!(decoded.unit().unwrap(), CurrencyUnit::Sat);
        assert_eq!(decoded.memo().clone().unwrap(), "Thank you.");
        assert_eq!(decoded.value().unwrap(), Amount::from(10));
    }

    #[test]
    fn test_no_forbidden_base64_characters() {
        // Build tokens until the raw CBOR is long enough that a standard
        // alphabet would have produced + or /
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();
        let proofs: Proofs = (0u8..16)
            .map(|i| {
                let c_preimage = [i; 33];
                Proof::new(
                    Amount::from(1),
                    keyset_id,
                    Secret::generate(),
                    hash_to_curve(&c_preimage).unwrap(),
                )
            })
            .collect();

        let token = Token::new(
            MintUrl::from_str("https://example.com").unwrap(),
            proofs,
            Some("memo".to_string()),
            CurrencyUnit::Sat,
        );

        let encoded = token.to_string();
        let payload = &encoded["cashuB".len()..];
        assert!(!payload.contains('+'));
        assert!(!payload.contains('/'));
    }

    #[test]
    fn test_empty_tokens_invalid() {
        // Zero mint entries
        let empty = TokenV3 {
            token: vec![],
            unit: Some(CurrencyUnit::Sat),
            memo: None,
        };
        let encoded = empty.to_string();
        assert!(Token::from_str(&encoded).is_err());

        // Entry with zero proofs
        let no_proofs = TokenV3 {
            token: vec![TokenV3Token {
                mint: MintUrl::from_str("https://example.com").unwrap(),
                proofs: vec![],
            }],
            unit: Some(CurrencyUnit::Sat),
            memo: None,
        };
        let encoded = no_proofs.to_string();
        assert!(Token::from_str(&encoded).is_err());
    }

    #[test]
    fn incorrect_tokens() {
        let incorrect_prefix = "casshuAeyJwcm9vZnMiOltdfQ";
        assert!(Token::from_str(incorrect_prefix).is_err());

        let no_prefix = "eyJwcm9vZnMiOltdfQ";
        assert!(Token::from_str(no_prefix).is_err());

        let not_base64 = "cashuA$$$";
        assert!(Token::from_str(not_base64).is_err());
    }

    #[test]
    fn test_token_with_duplicate_proofs() {
        let mint_url = MintUrl::from_str("https://example.com").unwrap();
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        let secret = Secret::generate();
        let proof1 = Proof::new(
            Amount::from(10),
            keyset_id,
            secret.clone(),
            "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                .parse()
                .unwrap(),
        );

        let proof2 = proof1.clone();

        let token = Token::new(mint_url.clone(), vec![proof1.clone(), proof2], None, CurrencyUnit::Sat);
        assert!(token.value().is_err());

        let proof3 = Proof::new(
            Amount::from(10),
            keyset_id,
            Secret::generate(),
            "03bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                .parse()
                .unwrap(),
        );

        let token = Token::new(mint_url, vec![proof1, proof3], None, CurrencyUnit::Sat);
        assert_eq!(token.value().unwrap(), Amount::from(20));
    }

    #[test]
    fn test_multi_mint_token_order_preserved() {
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();
        let mint_a = MintUrl::from_str("https://mint-a.example.com").unwrap();
        let mint_b = MintUrl::from_str("https://mint-b.example.com").unwrap();

        let proof = |amount: u64| {
            Proof::new(
                Amount::from(amount),
                keyset_id,
                Secret::generate(),
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                    .parse()
                    .unwrap(),
            )
        };

        let token = Token::TokenV4(TokenV4 {
            token: vec![
                TokenV4Entry::new(mint_a.clone(), vec![proof(1)]),
                TokenV4Entry::new(mint_b.clone(), vec![proof(2), proof(4)]),
            ],
            unit: CurrencyUnit::Sat,
            memo: None,
        });

        let decoded = Token::from_str(&token.to_string()).unwrap();

        assert_eq!(decoded.mint_urls(), vec![mint_a, mint_b]);
        assert_eq!(decoded.value().unwrap(), Amount::from(7));
    }
}
