//! NUT-22: Access tokens
//!
//! An optional `access_token` may be required on swap and melt requests.
//! The mint advertises the policy through its info response: when
//! `mandatory` is set every protected operation requires a token,
//! otherwise only the endpoints in the allowlist do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::nut03::SwapRequest;
use super::nut05::MeltRequest;

/// NUT22 Error
#[derive(Debug, Error)]
pub enum Error {
    /// Access token required but not provided
    #[error("Access token required")]
    AccessTokenRequired,
}

/// Access token settings advertised in mint info under `"22"`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessTokenSettings {
    /// When true every protected operation requires an access token
    #[serde(default)]
    pub mandatory: bool,
    /// Endpoints that require an access token when `mandatory` is false
    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl SwapRequest {
    /// Attach an access token
    pub fn with_access_token(mut self, access_token: String) -> Self {
        self.access_token = Some(access_token);
        self
    }

    /// Ensure the request carries an access token when the mint requires one
    pub fn check_access_token(&self, required: bool) -> Result<(), Error> {
        if required && self.access_token.is_none() {
            return Err(Error::AccessTokenRequired);
        }
        Ok(())
    }
}

impl MeltRequest {
    /// Attach an access token
    pub fn with_access_token(mut self, access_token: String) -> Self {
        self.access_token = Some(access_token);
        self
    }

    /// Ensure the request carries an access token when the mint requires one
    pub fn check_access_token(&self, required: bool) -> Result<(), Error> {
        if required && self.access_token.is_none() {
            return Err(Error::AccessTokenRequired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_deserialization() {
        let json = r#"{"mandatory":true,"endpoints":["/v1/swap","/v1/melt/bolt11"]}"#;
        let settings: AccessTokenSettings = serde_json::from_str(json).unwrap();

        assert!(settings.mandatory);
        assert_eq!(settings.endpoints.len(), 2);

        // Both fields default
        let settings: AccessTokenSettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.mandatory);
        assert!(settings.endpoints.is_empty());
    }

    #[test]
    fn test_check_access_token() {
        let request = SwapRequest::new(vec![], vec![]);

        assert!(request.check_access_token(false).is_ok());
        assert!(matches!(
            request.check_access_token(true),
            Err(Error::AccessTokenRequired)
        ));

        let request = request.with_access_token("token".to_string());
        assert!(request.check_access_token(true).is_ok());
    }
}
