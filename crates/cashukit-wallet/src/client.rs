//! Mint connector
//!
//! The typed boundary to the mint's HTTP surface. Transport
//! implementations (reqwest, test doubles, proxies) live outside this
//! crate; everything wallet-side speaks this trait.

use async_trait::async_trait;
use cashukit::nuts::{
    CheckStateRequest, CheckStateResponse, Id, KeySet, KeysetResponse, MeltQuoteBolt11Request,
    MeltQuoteBolt11Response, MeltRequest, MintInfo, MintQuoteBolt11Request,
    MintQuoteBolt11Response, MintRequest, MintResponse, RestoreRequest, RestoreResponse,
    SwapRequest, SwapResponse,
};

use crate::error::Error;

/// Interface the wallet uses to communicate with a mint
///
/// Endpoints follow the protocol-defined paths: `GET /v1/keys`,
/// `GET /v1/keysets`, `GET /v1/info`, `POST /v1/mint/quote/bolt11`,
/// `GET /v1/mint/quote/bolt11/{id}`, `POST /v1/mint/bolt11`,
/// `POST /v1/melt/quote/bolt11`, `GET /v1/melt/quote/bolt11/{id}`,
/// `POST /v1/melt/bolt11`, `POST /v1/swap`, `POST /v1/checkstate` and
/// `POST /v1/restore`.
#[async_trait]
pub trait MintConnector: Send + Sync {
    /// Get the mint's active keys [NUT-01]
    async fn get_mint_keys(&self) -> Result<Vec<KeySet>, Error>;

    /// Get the keys of one keyset [NUT-01]
    async fn get_mint_keyset(&self, keyset_id: Id) -> Result<KeySet, Error>;

    /// Get all keysets [NUT-02]
    async fn get_mint_keysets(&self) -> Result<KeysetResponse, Error>;

    /// Get mint info [NUT-06]
    async fn get_mint_info(&self) -> Result<MintInfo, Error>;

    /// Request a mint quote [NUT-04]
    async fn post_mint_quote(
        &self,
        request: MintQuoteBolt11Request,
    ) -> Result<MintQuoteBolt11Response, Error>;

    /// Check the state of a mint quote [NUT-04]
    async fn get_mint_quote_status(
        &self,
        quote_id: &str,
    ) -> Result<MintQuoteBolt11Response, Error>;

    /// Mint tokens for a paid quote [NUT-04]
    async fn post_mint(&self, request: MintRequest) -> Result<MintResponse, Error>;

    /// Request a melt quote [NUT-05]
    async fn post_melt_quote(
        &self,
        request: MeltQuoteBolt11Request,
    ) -> Result<MeltQuoteBolt11Response, Error>;

    /// Check the state of a melt quote [NUT-05]
    async fn get_melt_quote_status(
        &self,
        quote_id: &str,
    ) -> Result<MeltQuoteBolt11Response, Error>;

    /// Melt proofs against a quote [NUT-05]
    async fn post_melt(&self, request: MeltRequest) -> Result<MeltQuoteBolt11Response, Error>;

    /// Swap proofs for fresh outputs [NUT-03]
    async fn post_swap(&self, request: SwapRequest) -> Result<SwapResponse, Error>;

    /// Check the spend state of Y values [NUT-07]
    async fn post_check_state(
        &self,
        request: CheckStateRequest,
    ) -> Result<CheckStateResponse, Error>;

    /// Restore blind signatures for deterministic outputs [NUT-09]
    async fn post_restore(&self, request: RestoreRequest) -> Result<RestoreResponse, Error>;
}
