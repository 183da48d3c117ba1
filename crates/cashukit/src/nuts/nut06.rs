//! NUT-06: Mint Information
//!
//! <https://github.com/cashubtc/nuts/blob/main/06.md>

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::nut01::PublicKey;
use super::nut22::AccessTokenSettings;
use super::{nut04, nut05, nut17};

/// Mint Version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintVersion {
    /// Implementation name
    pub name: String,
    /// Implementation version
    pub version: String,
}

impl Serialize for MintVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let combined = format!("{}/{}", self.name, self.version);
        serializer.serialize_str(&combined)
    }
}

impl<'de> Deserialize<'de> for MintVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let combined = String::deserialize(deserializer)?;
        let (name, version) = combined
            .split_once('/')
            .ok_or(serde::de::Error::custom("Invalid version string"))?;
        Ok(MintVersion {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

/// Mint Info [NUT-06]
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    /// name of the mint and should be recognizable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// hex pubkey of the mint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    /// implementation name and the version running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<MintVersion>,
    /// short description of the mint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// long description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_long: Option<String>,
    /// contact methods to reach the mint operator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<ContactInfo>>,
    /// shows which NUTs the mint supports
    #[serde(default)]
    pub nuts: Nuts,
    /// message of the day that the wallet must display to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
}

impl MintInfo {
    /// Whether an access token must accompany requests to `path`
    ///
    /// When the mint marks NUT-22 `mandatory`, every protected operation
    /// requires a token; otherwise the per-endpoint allowlist governs.
    pub fn access_token_required(&self, path: &str) -> bool {
        match &self.nuts.nut22 {
            Some(settings) => {
                settings.mandatory || settings.endpoints.iter().any(|e| e == path)
            }
            None => false,
        }
    }
}

/// Contact method to reach the mint operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Contact method (email, twitter, nostr, ...)
    pub method: String,
    /// Contact info (address, npub, ...)
    pub info: String,
}

/// Supported nuts and settings
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nuts {
    /// NUT04 Settings
    #[serde(default)]
    #[serde(rename = "4")]
    pub nut04: nut04::Settings,
    /// NUT05 Settings
    #[serde(default)]
    #[serde(rename = "5")]
    pub nut05: nut05::Settings,
    /// NUT07 Settings
    #[serde(default)]
    #[serde(rename = "7")]
    pub nut07: SupportedSettings,
    /// NUT09 Settings
    #[serde(default)]
    #[serde(rename = "9")]
    pub nut09: SupportedSettings,
    /// NUT17 Settings
    #[serde(default)]
    #[serde(rename = "17")]
    pub nut17: nut17::SupportedSettings,
    /// NUT20 Settings
    #[serde(default)]
    #[serde(rename = "20")]
    pub nut20: SupportedSettings,
    /// NUT22 Settings
    #[serde(default)]
    #[serde(rename = "22", skip_serializing_if = "Option::is_none")]
    pub nut22: Option<AccessTokenSettings>,
}

/// Check state Settings
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupportedSettings {
    /// Whether the nut is supported
    pub supported: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_des_mint_info() {
        let mint_info_str = r#"{
  "name": "Bob's Cashu mint",
  "pubkey": "0283bf290884eed3a7ca2663fc0260de2e2064d6b355ea13f98dec004b7a7ead99",
  "version": "Nutshell/0.15.0",
  "description": "The short mint description",
  "description_long": "A description that can be a long piece of text.",
  "contact": [
    {"method": "email", "info": "contact@me.com"},
    {"method": "nostr", "info": "npub..."}
  ],
  "motd": "Message to display to users.",
  "nuts": {
    "4": {
      "methods": [
        {
        "method": "bolt11",
        "unit": "sat",
        "min_amount": 0,
        "max_amount": 10000
        }
      ],
      "disabled": false
    },
    "5": {
      "methods": [
        {
        "method": "bolt11",
        "unit": "sat",
        "min_amount": 0,
        "max_amount": 10000
        }
      ],
      "disabled": false
    },
    "7": {"supported": true},
    "9": {"supported": true},
    "20": {"supported": true}
  }
}"#;
        let info: MintInfo = serde_json::from_str(mint_info_str).unwrap();

        assert_eq!(info.name.as_deref(), Some("Bob's Cashu mint"));
        assert_eq!(info.version.as_ref().unwrap().name, "Nutshell");
        assert!(info.nuts.nut07.supported);
        assert!(info.nuts.nut22.is_none());
        assert!(!info.access_token_required("/v1/swap"));
    }

    #[test]
    fn test_access_token_required() {
        let mint_info_str = r#"{
  "nuts": {
    "22": {"mandatory": false, "endpoints": ["/v1/swap"]}
  }
}"#;
        let info: MintInfo = serde_json::from_str(mint_info_str).unwrap();

        assert!(info.access_token_required("/v1/swap"));
        assert!(!info.access_token_required("/v1/melt/bolt11"));

        let mandatory_str = r#"{
  "nuts": {
    "22": {"mandatory": true}
  }
}"#;
        let info: MintInfo = serde_json::from_str(mandatory_str).unwrap();

        assert!(info.access_token_required("/v1/swap"));
        assert!(info.access_token_required("/v1/melt/bolt11"));
    }
}
