//! Secure storage
//!
//! Abstract persistence contract for the mnemonic, seed and per-mint
//! access tokens. Implementations beyond this boundary (OS keychains,
//! hardware-backed stores) live outside the core; the in-memory store
//! backs tests and ephemeral wallets.

use std::collections::HashMap;

use async_trait::async_trait;
use cashukit::mint_url::MintUrl;
use tokio::sync::Mutex;

use crate::error::Error;

/// Persistence contract for wallet secrets
///
/// Load failures caused by user-presence or biometric gating surface as
/// [`Error::StorageError`]-style retrieval failures and are non-retryable.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Persist the mnemonic
    async fn save_mnemonic(&self, mnemonic: &str) -> Result<(), Error>;
    /// Load the mnemonic
    async fn load_mnemonic(&self) -> Result<Option<String>, Error>;
    /// Delete the mnemonic
    async fn delete_mnemonic(&self) -> Result<(), Error>;

    /// Persist the hex encoded seed
    async fn save_seed(&self, seed_hex: &str) -> Result<(), Error>;
    /// Load the hex encoded seed
    async fn load_seed(&self) -> Result<Option<String>, Error>;
    /// Delete the seed
    async fn delete_seed(&self) -> Result<(), Error>;

    /// Persist an access token for a mint
    async fn save_access_token(&self, token: &str, mint_url: &MintUrl) -> Result<(), Error>;
    /// Load the access token for a mint
    async fn load_access_token(&self, mint_url: &MintUrl) -> Result<Option<String>, Error>;
    /// Delete the access token for a mint
    async fn delete_access_token(&self, mint_url: &MintUrl) -> Result<(), Error>;

    /// Persist a list of access tokens for a mint
    async fn save_access_token_list(
        &self,
        tokens: Vec<String>,
        mint_url: &MintUrl,
    ) -> Result<(), Error>;
    /// Load the list of access tokens for a mint
    async fn load_access_token_list(&self, mint_url: &MintUrl)
        -> Result<Option<Vec<String>>, Error>;
    /// Delete the list of access tokens for a mint
    async fn delete_access_token_list(&self, mint_url: &MintUrl) -> Result<(), Error>;

    /// Drop everything
    async fn clear_all(&self) -> Result<(), Error>;
    /// Whether any data is stored
    async fn has_stored_data(&self) -> Result<bool, Error>;
}

#[derive(Debug, Default)]
struct SecureStoreInner {
    mnemonic: Option<String>,
    seed_hex: Option<String>,
    access_tokens: HashMap<MintUrl, String>,
    access_token_lists: HashMap<MintUrl, Vec<String>>,
}

/// In-memory [`SecureStore`]
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    inner: Mutex<SecureStoreInner>,
}

impl MemorySecureStore {
    /// New empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn save_mnemonic(&self, mnemonic: &str) -> Result<(), Error> {
        self.inner.lock().await.mnemonic = Some(mnemonic.to_string());
        Ok(())
    }

    async fn load_mnemonic(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.lock().await.mnemonic.clone())
    }

    async fn delete_mnemonic(&self) -> Result<(), Error> {
        self.inner.lock().await.mnemonic = None;
        Ok(())
    }

    async fn save_seed(&self, seed_hex: &str) -> Result<(), Error> {
        self.inner.lock().await.seed_hex = Some(seed_hex.to_string());
        Ok(())
    }

    async fn load_seed(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.lock().await.seed_hex.clone())
    }

    async fn delete_seed(&self) -> Result<(), Error> {
        self.inner.lock().await.seed_hex = None;
        Ok(())
    }

    async fn save_access_token(&self, token: &str, mint_url: &MintUrl) -> Result<(), Error> {
        self.inner
            .lock()
            .await
            .access_tokens
            .insert(mint_url.clone(), token.to_string());
        Ok(())
    }

    async fn load_access_token(&self, mint_url: &MintUrl) -> Result<Option<String>, Error> {
        Ok(self.inner.lock().await.access_tokens.get(mint_url).cloned())
    }

    async fn delete_access_token(&self, mint_url: &MintUrl) -> Result<(), Error> {
        self.inner.lock().await.access_tokens.remove(mint_url);
        Ok(())
    }

    async fn save_access_token_list(
        &self,
        tokens: Vec<String>,
        mint_url: &MintUrl,
    ) -> Result<(), Error> {
        self.inner
            .lock()
            .await
            .access_token_lists
            .insert(mint_url.clone(), tokens);
        Ok(())
    }

    async fn load_access_token_list(
        &self,
        mint_url: &MintUrl,
    ) -> Result<Option<Vec<String>>, Error> {
        Ok(self
            .inner
            .lock()
            .await
            .access_token_lists
            .get(mint_url)
            .cloned())
    }

    async fn delete_access_token_list(&self, mint_url: &MintUrl) -> Result<(), Error> {
        self.inner.lock().await.access_token_lists.remove(mint_url);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        *inner = SecureStoreInner::default();
        Ok(())
    }

    async fn has_stored_data(&self) -> Result<bool, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.mnemonic.is_some()
            || inner.seed_hex.is_some()
            || !inner.access_tokens.is_empty()
            || !inner.access_token_lists.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn mint_url() -> MintUrl {
        MintUrl::from_str("https://mint.example.com").unwrap()
    }

    #[tokio::test]
    async fn test_mnemonic_round_trip() {
        let store = MemorySecureStore::new();

        assert!(!store.has_stored_data().await.unwrap());
        assert_eq!(store.load_mnemonic().await.unwrap(), None);

        store.save_mnemonic("word word word").await.unwrap();
        assert_eq!(
            store.load_mnemonic().await.unwrap().as_deref(),
            Some("word word word")
        );
        assert!(store.has_stored_data().await.unwrap());

        store.delete_mnemonic().await.unwrap();
        assert_eq!(store.load_mnemonic().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_access_tokens_per_mint() {
        let store = MemorySecureStore::new();
        let other = MintUrl::from_str("https://other.example.com").unwrap();

        store.save_access_token("token-a", &mint_url()).await.unwrap();

        assert_eq!(
            store.load_access_token(&mint_url()).await.unwrap().as_deref(),
            Some("token-a")
        );
        assert_eq!(store.load_access_token(&other).await.unwrap(), None);

        store
            .save_access_token_list(vec!["t1".to_string(), "t2".to_string()], &mint_url())
            .await
            .unwrap();
        assert_eq!(
            store
                .load_access_token_list(&mint_url())
                .await
                .unwrap()
                .unwrap()
                .len(),
            2
        );

        store.delete_access_token(&mint_url()).await.unwrap();
        store.delete_access_token_list(&mint_url()).await.unwrap();
        assert_eq!(store.load_access_token(&mint_url()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = MemorySecureStore::new();

        store.save_mnemonic("words").await.unwrap();
        store.save_seed("00ff").await.unwrap();
        store.save_access_token("token", &mint_url()).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(!store.has_stored_data().await.unwrap());
        assert_eq!(store.load_seed().await.unwrap(), None);
    }
}
