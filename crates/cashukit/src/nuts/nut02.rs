//! NUT-02: Keysets and keyset ID
//!
//! <https://github.com/cashubtc/nuts/blob/main/02.md>

use core::fmt;
use core::str::FromStr;
use std::array::TryFromSliceError;

use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, VecSkipError};
use thiserror::Error;

use super::nut01::Keys;
use crate::nuts::nut00::CurrencyUnit;
use crate::util::hex;

/// NUT02 Error
#[derive(Debug, Error)]
pub enum Error {
    /// Hex Error
    #[error(transparent)]
    HexError(#[from] hex::Error),
    /// Keyset length error
    #[error("NUT02: ID length invalid")]
    Length,
    /// Unknown version
    #[error("NUT02: Unknown Version")]
    UnknownVersion,
    /// Slice Error
    #[error(transparent)]
    Slice(#[from] TryFromSliceError),
}

/// Keyset version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeySetVersion {
    /// Current Version 00
    Version00,
}

impl KeySetVersion {
    /// [`KeySetVersion`] to byte
    pub fn to_byte(&self) -> u8 {
        match self {
            Self::Version00 => 0,
        }
    }

    /// [`KeySetVersion`] from byte
    pub fn from_byte(byte: &u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Version00),
            _ => Err(Error::UnknownVersion),
        }
    }
}

impl fmt::Display for KeySetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySetVersion::Version00 => f.write_str("00"),
        }
    }
}

/// A keyset ID is an identifier for a specific keyset. It can be derived by
/// anyone who knows the set of public keys of a mint. The keyset ID **CAN**
/// be stored in a Cashu token such that the token can be used to identify
/// which mint or keyset it was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    version: KeySetVersion,
    id: [u8; Self::BYTELEN],
}

impl Id {
    const STRLEN: usize = 14;
    const BYTELEN: usize = 7;

    /// [`Id`] to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        [vec![self.version.to_byte()], self.id.to_vec()].concat()
    }

    /// [`Id`] from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::BYTELEN + 1 {
            return Err(Error::Length);
        }

        Ok(Self {
            version: KeySetVersion::from_byte(&bytes[0])?,
            id: bytes[1..].try_into()?,
        })
    }

    /// [`Id`] version
    pub fn version(&self) -> KeySetVersion {
        self.version
    }
}

impl TryFrom<Id> for u64 {
    type Error = Error;

    /// Derivation index for a keyset id: the id bytes as a big-endian
    /// integer reduced modulo `2^31 - 1`
    fn try_from(value: Id) -> Result<Self, Self::Error> {
        let bytes: [u8; 8] = value.to_bytes().try_into().map_err(|_| Error::Length)?;

        let int = u64::from_be_bytes(bytes);

        Ok(int % (2_u64.pow(31) - 1))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{}{}", self.version, hex::encode(self.id)))
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::STRLEN + 2 {
            return Err(Error::Length);
        }

        // Hex decode validates the characters; from_bytes validates the
        // version prefix
        Self::from_bytes(&hex::decode(s)?)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = Id;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 16 char hex string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Id::from_str(v).map_err(|e| match e {
                    Error::Length => E::custom(format!(
                        "Invalid Length: Expected {}, got {}",
                        Id::STRLEN + 2,
                        v.len()
                    )),
                    _ => E::custom(e),
                })
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}

impl From<&Keys> for Id {
    fn from(map: &Keys) -> Self {
        /* NUT-02
            1 - sort public keys by their amount in ascending order
            2 - concatenate all public keys to one byte string
            3 - HASH_SHA256 the concatenated public keys
            4 - take the first 14 characters of the hex-encoded hash
            5 - prefix it with a keyset ID version byte
        */

        // Keys is a BTreeMap keyed by Amount so iteration is already in
        // ascending numeric order
        let pubkeys_concat: Vec<u8> = map
            .iter()
            .map(|(_, pubkey)| pubkey.to_bytes())
            .collect::<Vec<[u8; 33]>>()
            .concat();

        let hash = Sha256::hash(&pubkeys_concat);
        let hex_of_hash = hex::encode(hash.to_byte_array());

        Self {
            version: KeySetVersion::Version00,
            id: hex::decode(&hex_of_hash[0..Self::STRLEN])
                .expect("Keys hash could not be hex decoded")
                .try_into()
                .expect("Invalid length of hex id"),
        }
    }
}

/// Mint keyset ids [NUT-02]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetResponse {
    /// Set of keysets the mint generates
    #[serde_as(as = "VecSkipError<_>")]
    pub keysets: Vec<KeySetInfo>,
}

/// Keyset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeySet {
    /// Keyset [`Id`]
    pub id: Id,
    /// Keyset [`CurrencyUnit`]
    pub unit: CurrencyUnit,
    /// Keyset [`Keys`]
    pub keys: Keys,
}

impl KeySet {
    /// Verify the keyset id matches the keys
    pub fn verify_id(&self) -> bool {
        Id::from(&self.keys) == self.id
    }
}

/// KeySetInfo
#[derive(Debug, Clone, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeySetInfo {
    /// Keyset [`Id`]
    pub id: Id,
    /// Keyset [`CurrencyUnit`]
    pub unit: CurrencyUnit,
    /// Keyset state
    ///
    /// The mint will only sign with an active keyset
    pub active: bool,
    /// Input fee, in parts per thousand per input proof
    #[serde(default)]
    pub input_fee_ppk: u64,
    /// Unix timestamp after which the keyset can no longer be used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_expiry: Option<u64>,
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::KeysResponse;

    const SHORT_KEYSET_ID: &str = "00456a94ab4e1c46";
    const SHORT_KEYSET: &str = r#"
        {
            "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
            "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de",
            "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
            "8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528"
        }
    "#;

    #[test]
    fn test_deserialization_and_id_generation() {
        let keys: Keys = serde_json::from_str(SHORT_KEYSET).unwrap();

        let id: Id = (&keys).into();

        assert_eq!(id, Id::from_str(SHORT_KEYSET_ID).unwrap());
    }

    #[test]
    fn test_id_generation_order_independent() {
        // Same keys, declared in a different order
        let shuffled = r#"
        {
            "8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528",
            "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
            "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
            "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de"
        }
        "#;

        let keys: Keys = serde_json::from_str(shuffled).unwrap();

        let id: Id = (&keys).into();

        assert_eq!(id, Id::from_str(SHORT_KEYSET_ID).unwrap());
    }

    #[test]
    fn test_id_validation() {
        // Wrong length
        assert!(Id::from_str("009a1f293253e41").is_err());
        assert!(Id::from_str("009a1f293253e41e00").is_err());
        // Not hex
        assert!(Id::from_str("00zz1f293253e41e").is_err());
        // Unknown version
        assert!(Id::from_str("019a1f293253e41e").is_err());
        // Valid
        assert!(Id::from_str("009a1f293253e41e").is_ok());
    }

    #[test]
    fn test_to_int() {
        let id = Id::from_str("009a1f293253e41e").unwrap();

        let id_int = u64::try_from(id).unwrap();
        assert_eq!(864559728, id_int)
    }

    #[test]
    fn test_keyset_bytes() {
        let id = Id::from_str("009a1f293253e41e").unwrap();

        let id_bytes = id.to_bytes();

        assert_eq!(id_bytes.len(), 8);

        let id_from_bytes = Id::from_bytes(&id_bytes).unwrap();

        assert_eq!(id_from_bytes, id);
    }

    #[test]
    fn test_deserialization_keyset_info() {
        let h = r#"{"id":"009a1f293253e41e","unit":"sat","active":true}"#;

        let keyset_info: KeySetInfo = serde_json::from_str(h).unwrap();
        assert_eq!(keyset_info.input_fee_ppk, 0);

        let h = r#"{"id":"009a1f293253e41e","unit":"sat","active":true,"input_fee_ppk":100}"#;

        let keyset_info: KeySetInfo = serde_json::from_str(h).unwrap();
        assert_eq!(keyset_info.input_fee_ppk, 100);
    }

    #[test]
    fn test_deserialization_of_keyset_response() {
        // Unknown id formats (e.g. legacy base64 ids) are skipped, not fatal
        let h = r#"{"keysets":[{"id":"009a1f293253e41e","unit":"sat","active":true, "input_fee_ppk": 100},{"id":"eGnEWtdJ0PIM","unit":"sat","active":true},{"id":"003dfdf4e5e35487","unit":"sat","active":true}]}"#;

        let keyset_response: KeysetResponse = serde_json::from_str(h).unwrap();

        assert_eq!(keyset_response.keysets.len(), 2);
    }

    #[test]
    fn test_keys_response_skips_invalid_keysets() {
        let keys = r#"{"keysets":[{"id":"00456a94ab4e1c46","unit":"sat","keys":{"1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc","2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de","4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303","8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528"}},{"id":"badid","unit":"sat","keys":{}}]}"#;

        let keys_response: KeysResponse = serde_json::from_str(keys).unwrap();

        assert_eq!(keys_response.keysets.len(), 1);
        assert!(keys_response.keysets[0].verify_id());
    }
}
