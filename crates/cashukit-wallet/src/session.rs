//! Wallet session
//!
//! The single owning object for wallet state: the proof store and
//! manager, the counter ledger, the resilience layer and the secure-store
//! handle. Protocol components stay pure and are borrowed. Multi-step
//! workflows reserve pending state up front and release it by finalizing
//! on success or rolling back on failure.

use std::collections::HashMap;
use std::sync::Arc;

use bitcoin::bip32::Xpriv;
use cashukit::amount::SplitTarget;
use cashukit::dhke::construct_proofs;
use cashukit::mint_url::MintUrl;
use cashukit::nuts::{
    CheckStateRequest, CurrencyUnit, Id, KeySetInfo, Keys, MeltQuoteBolt11Request,
    MeltQuoteBolt11Response, MeltQuoteState, MeltRequest, MintInfo, MintQuoteBolt11Request,
    MintQuoteState, MintRequest, PreMintSecrets, Proofs, ProofsMethods, RestoreRequest,
    SecretKey, State, SwapRequest, Token,
};
use cashukit::util::unix_time;
use cashukit::{Amount, Bolt11Invoice};
use tokio::sync::RwLock;

use crate::client::MintConnector;
use crate::counter::CounterLedger;
use crate::error::Error;
use crate::proofs::ProofManager;
use crate::resilience::Resilience;
use crate::secure::SecureStore;
use crate::seed;
use crate::store::ProofStore;
use crate::types::{MeltQuote, MintQuote};

/// Number of counters checked per NUT-09 restore window
const RESTORE_BATCH: u32 = 100;

/// Wallet session for one mint and unit
pub struct WalletSession {
    mint_url: MintUrl,
    unit: CurrencyUnit,
    connector: Arc<dyn MintConnector>,
    secure_store: Arc<dyn SecureStore>,
    proofs: ProofManager,
    counters: CounterLedger,
    resilience: Resilience,
    xpriv: RwLock<Option<Xpriv>>,
    keysets: RwLock<HashMap<Id, KeySetInfo>>,
    keys: RwLock<HashMap<Id, Keys>>,
    mint_info: RwLock<Option<MintInfo>>,
    mint_quotes: RwLock<HashMap<String, MintQuote>>,
    melt_quotes: RwLock<HashMap<String, MeltQuote>>,
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("mint_url", &self.mint_url)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// New session over a mint connector and stores
    pub fn new(
        mint_url: MintUrl,
        unit: CurrencyUnit,
        connector: Arc<dyn MintConnector>,
        secure_store: Arc<dyn SecureStore>,
        proof_store: Arc<dyn ProofStore>,
    ) -> Self {
        Self {
            mint_url,
            unit,
            connector,
            secure_store,
            proofs: ProofManager::new(proof_store),
            counters: CounterLedger::new(),
            resilience: Resilience::default(),
            xpriv: RwLock::new(None),
            keysets: RwLock::new(HashMap::new()),
            keys: RwLock::new(HashMap::new()),
            mint_info: RwLock::new(None),
            mint_quotes: RwLock::new(HashMap::new()),
            melt_quotes: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the resilience configuration
    pub fn with_resilience(mut self, resilience: Resilience) -> Self {
        self.resilience = resilience;
        self
    }

    /// The proof manager
    pub fn proofs(&self) -> &ProofManager {
        &self.proofs
    }

    /// The counter ledger
    pub fn counters(&self) -> &CounterLedger {
        &self.counters
    }

    /// The session's mint url
    pub fn mint_url(&self) -> &MintUrl {
        &self.mint_url
    }

    // --- Initialization -------------------------------------------------

    /// Initialize from a mnemonic, persisting it through the secure store
    pub async fn init_with_mnemonic(
        &self,
        mnemonic: &str,
        passphrase: &str,
    ) -> Result<(), Error> {
        if self.xpriv.read().await.is_some() {
            return Err(Error::WalletAlreadyInitialized);
        }

        let seed_bytes = seed::seed_from_mnemonic(mnemonic, passphrase)?;
        let xpriv = seed::master_xpriv(&seed_bytes)?;

        self.secure_store.save_mnemonic(mnemonic).await?;
        self.secure_store
            .save_seed(&cashukit::util::hex::encode(seed_bytes))
            .await?;

        *self.xpriv.write().await = Some(xpriv);
        Ok(())
    }

    /// Initialize with a freshly generated 12 word mnemonic
    pub async fn init_random(&self) -> Result<String, Error> {
        let mnemonic = seed::generate_mnemonic(128)?;
        self.init_with_mnemonic(&mnemonic.to_string(), "").await?;
        Ok(mnemonic.to_string())
    }

    /// Initialize from whatever the secure store holds
    pub async fn load_from_store(&self) -> Result<(), Error> {
        if self.xpriv.read().await.is_some() {
            return Err(Error::WalletAlreadyInitialized);
        }

        if let Some(mnemonic) = self.secure_store.load_mnemonic().await? {
            let seed_bytes = seed::seed_from_mnemonic(&mnemonic, "")?;
            *self.xpriv.write().await = Some(seed::master_xpriv(&seed_bytes)?);
            return Ok(());
        }

        if let Some(seed_hex) = self.secure_store.load_seed().await? {
            let seed_bytes = cashukit::util::hex::decode(&seed_hex)?;
            *self.xpriv.write().await = Some(seed::master_xpriv(&seed_bytes)?);
            return Ok(());
        }

        Err(Error::NoKeychainData)
    }

    async fn require_xpriv(&self) -> Result<Xpriv, Error> {
        (*self.xpriv.read().await).ok_or(Error::WalletNotInitialized)
    }

    // --- Keysets --------------------------------------------------------

    /// Fetch mint info, keysets and keys
    pub async fn refresh_mint(&self) -> Result<(), Error> {
        let connector = Arc::clone(&self.connector);
        let info = self
            .resilience
            .execute("info", |_ctx| {
                let connector = Arc::clone(&connector);
                async move { connector.get_mint_info().await }
            })
            .await?;
        *self.mint_info.write().await = Some(info);

        let connector = Arc::clone(&self.connector);
        let keysets = self
            .resilience
            .execute("keysets", |_ctx| {
                let connector = Arc::clone(&connector);
                async move { connector.get_mint_keysets().await }
            })
            .await?;

        let mut keyset_map = self.keysets.write().await;
        for info in keysets.keysets {
            self.proofs.set_keyset_fee(info.id, info.input_fee_ppk).await;
            keyset_map.insert(info.id, info);
        }
        drop(keyset_map);

        let connector = Arc::clone(&self.connector);
        let keysets = self
            .resilience
            .execute("keys", |_ctx| {
                let connector = Arc::clone(&connector);
                async move { connector.get_mint_keys().await }
            })
            .await?;

        let mut keys_map = self.keys.write().await;
        for keyset in keysets {
            if keyset.verify_id() {
                keys_map.insert(keyset.id, keyset.keys);
            } else {
                tracing::warn!("mint returned keys not matching keyset id {}", keyset.id);
            }
        }

        Ok(())
    }

    /// The active keyset for this session's unit
    pub async fn active_keyset(&self) -> Result<KeySetInfo, Error> {
        let now = unix_time();
        self.keysets
            .read()
            .await
            .values()
            .find(|info| {
                info.active
                    && info.unit == self.unit
                    && info.final_expiry.map_or(true, |expiry| expiry > now)
            })
            .cloned()
            .ok_or(Error::NoActiveKeyset)
    }

    async fn keys_for(&self, keyset_id: Id) -> Result<Keys, Error> {
        if let Some(keys) = self.keys.read().await.get(&keyset_id) {
            return Ok(keys.clone());
        }

        let connector = Arc::clone(&self.connector);
        let keyset = self
            .resilience
            .execute("keys", |_ctx| {
                let connector = Arc::clone(&connector);
                async move { connector.get_mint_keyset(keyset_id).await }
            })
            .await?;

        if !keyset.verify_id() {
            return Err(Error::InvalidKeysetId);
        }

        self.keys
            .write()
            .await
            .insert(keyset.id, keyset.keys.clone());
        Ok(keyset.keys)
    }

    /// Access token for this mint, when its info says one is required
    async fn access_token_for(&self, path: &str) -> Result<Option<String>, Error> {
        let required = self
            .mint_info
            .read()
            .await
            .as_ref()
            .map(|info| info.access_token_required(path))
            .unwrap_or(false);

        if !required {
            return Ok(None);
        }

        match self.secure_store.load_access_token(&self.mint_url).await? {
            Some(token) => Ok(Some(token)),
            None => Err(Error::MissingRequiredField("access_token".to_string())),
        }
    }

    // --- Balances -------------------------------------------------------

    /// Total available balance
    pub async fn total_balance(&self) -> Result<Amount, Error> {
        self.proofs.total_balance().await
    }

    /// Available balance in one keyset
    pub async fn balance(&self, keyset_id: Id) -> Result<Amount, Error> {
        self.proofs.balance(keyset_id).await
    }

    // --- Mint -----------------------------------------------------------

    /// Request a mint quote, locking it to a fresh NUT-20 key
    pub async fn mint_quote(
        &self,
        amount: Amount,
        description: Option<String>,
    ) -> Result<MintQuote, Error> {
        let secret_key = SecretKey::generate();

        let request = MintQuoteBolt11Request {
            amount,
            unit: self.unit.clone(),
            description,
            pubkey: Some(secret_key.public_key()),
        };

        if !request.validate() {
            return Err(Error::InvalidAmount);
        }

        let connector = Arc::clone(&self.connector);
        let response = self
            .resilience
            .execute("mint_quote", |_ctx| {
                let connector = Arc::clone(&connector);
                let request = request.clone();
                async move { connector.post_mint_quote(request).await }
            })
            .await?;

        let quote = MintQuote {
            id: response.quote.clone(),
            mint_url: self.mint_url.clone(),
            amount,
            unit: self.unit.clone(),
            request: response.request,
            state: response.state,
            expiry: response.expiry.unwrap_or_default(),
            secret_key: Some(secret_key),
        };

        self.mint_quotes
            .write()
            .await
            .insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    /// Mint ecash for a paid quote
    ///
    /// Outputs are derived deterministically; the keyset counter is
    /// reserved before the round-trip and rewound if it fails.
    pub async fn mint(&self, quote_id: &str) -> Result<Amount, Error> {
        let xpriv = self.require_xpriv().await?;

        let quote = self
            .mint_quotes
            .read()
            .await
            .get(quote_id)
            .cloned()
            .ok_or(Error::QuoteNotFound)?;

        let connector = Arc::clone(&self.connector);
        let quote_id_owned = quote_id.to_string();
        let status = self
            .resilience
            .execute("mint_quote_status", |_ctx| {
                let connector = Arc::clone(&connector);
                let quote_id = quote_id_owned.clone();
                async move { connector.get_mint_quote_status(&quote_id).await }
            })
            .await?;

        match status.state {
            MintQuoteState::Paid => {}
            MintQuoteState::Pending | MintQuoteState::Unpaid => return Err(Error::QuotePending),
            MintQuoteState::Issued => return Err(Error::TokenAlreadyUsed),
        }

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        let premint_count = quote.amount.split().len() as u32;
        let counter_start = self.counters.increment(keyset.id, premint_count).await;

        let premint = match PreMintSecrets::from_xpriv(
            keyset.id,
            counter_start,
            xpriv,
            quote.amount,
            &SplitTarget::None,
        ) {
            Ok(premint) => premint,
            Err(err) => {
                self.counters.rewind(keyset.id, counter_start).await;
                return Err(err.into());
            }
        };

        let mut request = MintRequest::new(quote_id.to_string(), premint.blinded_messages());

        if let Some(secret_key) = quote.secret_key.clone() {
            request.sign(secret_key)?;
        }

        let connector = Arc::clone(&self.connector);
        let response = match self
            .resilience
            .execute("mint", |_ctx| {
                let connector = Arc::clone(&connector);
                let request = request.clone();
                async move { connector.post_mint(request).await }
            })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                // Failed round-trip: the reserved counters were not
                // consumed by the mint
                self.counters.rewind(keyset.id, counter_start).await;
                return Err(err);
            }
        };

        let proofs = construct_proofs(
            response.signatures,
            premint.rs(),
            premint.secrets(),
            &keys,
        )?;

        let minted = proofs.total_amount()?;
        self.proofs.add_proofs(proofs).await?;

        if let Some(quote) = self.mint_quotes.write().await.get_mut(quote_id) {
            quote.state = MintQuoteState::Issued;
        }

        Ok(minted)
    }

    // --- Swap -----------------------------------------------------------

    /// Swap stored proofs so that `amount` becomes available as an exact
    /// set of fresh proofs; change is stored
    pub async fn swap(&self, amount: Amount) -> Result<Proofs, Error> {
        let xpriv = self.require_xpriv().await?;
        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        // Select enough inputs to cover the amount and the input fee
        let mut inputs = self.proofs.select_proofs(amount, None).await?;
        let mut fee = self.proofs.fee_for(&inputs).await?;

        loop {
            let input_total = inputs.total_amount()?;
            let needed = amount.checked_add(fee).ok_or(Error::AmountTooLarge)?;
            if input_total >= needed {
                break;
            }
            inputs = self.proofs.select_proofs(needed, None).await?;
            fee = self.proofs.fee_for(&inputs).await?;
        }

        let input_total = inputs.total_amount()?;
        let output_amount = input_total - fee;

        let premint_count = output_amount
            .split_targeted(&SplitTarget::Value(amount))?
            .len() as u32;

        // Reserve the inputs; this is the linearization point for the
        // spend attempt
        self.proofs.store().mark_pending_spent(&inputs).await?;
        let counter_start = self.counters.increment(keyset.id, premint_count).await;

        let result: Result<Proofs, Error> = async {
            let premint = PreMintSecrets::from_xpriv(
                keyset.id,
                counter_start,
                xpriv,
                output_amount,
                &SplitTarget::Value(amount),
            )
            .map_err(Error::from)?;

            let mut request = SwapRequest::new(inputs.clone(), premint.blinded_messages());
            if let Some(token) = self.access_token_for("/v1/swap").await? {
                request.access_token = Some(token);
            }

            let connector = Arc::clone(&self.connector);
            let response = self
                .resilience
                .execute("swap", |_ctx| {
                    let connector = Arc::clone(&connector);
                    let request = request.clone();
                    async move { connector.post_swap(request).await }
                })
                .await?;

            Ok(construct_proofs(
                response.signatures,
                premint.rs(),
                premint.secrets(),
                &keys,
            )?)
        }
        .await;

        match result {
            Ok(fresh) => {
                self.proofs.store().finalize_pending_spent(&inputs).await?;

                // Partition: an exact set for the caller, the change is
                // stored
                let (send, change) = partition_exact(fresh, amount)?;
                self.proofs.add_proofs(change).await?;
                Ok(send)
            }
            Err(err) => {
                // Deterministic release before the failure surfaces; the
                // reserved counters were never consumed by the mint
                self.counters.rewind(keyset.id, counter_start).await;
                self.proofs.store().rollback_pending_spent(&inputs).await?;
                Err(err)
            }
        }
    }

    /// Prepare a token for sending; the proofs are held pending until
    /// [`WalletSession::finalize_send`] or [`WalletSession::cancel_send`]
    pub async fn prepare_send(
        &self,
        amount: Amount,
        memo: Option<String>,
    ) -> Result<(Token, Proofs), Error> {
        let send_proofs = self.swap(amount).await?;

        self.proofs.store().store(send_proofs.clone()).await?;
        self.proofs
            .store()
            .mark_pending_spent(&send_proofs)
            .await?;

        let token = Token::new(
            self.mint_url.clone(),
            send_proofs.clone(),
            memo,
            self.unit.clone(),
        );

        Ok((token, send_proofs))
    }

    /// The recipient redeemed the token; drop the pending proofs
    pub async fn finalize_send(&self, proofs: &Proofs) -> Result<(), Error> {
        self.proofs.store().finalize_pending_spent(proofs).await
    }

    /// The send was abandoned; make the proofs spendable again
    pub async fn cancel_send(&self, proofs: &Proofs) -> Result<(), Error> {
        self.proofs.store().rollback_pending_spent(proofs).await
    }

    // --- Receive --------------------------------------------------------

    /// Receive a token by swapping its proofs for fresh ones
    pub async fn receive(&self, token: &Token) -> Result<Amount, Error> {
        let xpriv = self.require_xpriv().await?;

        let mint_urls = token.mint_urls();
        if !mint_urls.iter().all(|url| url == &self.mint_url) {
            return Err(Error::InvalidMintURL);
        }

        if let Some(unit) = token.unit() {
            if unit != self.unit {
                return Err(Error::InvalidUnit);
            }
        }

        let inputs = token.proofs()?;
        if inputs.is_empty() {
            return Err(Error::InvalidTokenStructure);
        }

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        let input_total = inputs.total_amount()?;
        let fee = self.proofs.fee_for(&inputs).await?;
        let output_amount = input_total
            .checked_sub(fee)
            .ok_or(Error::BalanceInsufficient)?;

        let premint_count = output_amount.split().len() as u32;
        let counter_start = self.counters.increment(keyset.id, premint_count).await;

        let premint = match PreMintSecrets::from_xpriv(
            keyset.id,
            counter_start,
            xpriv,
            output_amount,
            &SplitTarget::None,
        ) {
            Ok(premint) => premint,
            Err(err) => {
                self.counters.rewind(keyset.id, counter_start).await;
                return Err(err.into());
            }
        };

        let mut request = SwapRequest::new(inputs, premint.blinded_messages());
        if let Some(token) = self.access_token_for("/v1/swap").await? {
            request.access_token = Some(token);
        }

        let connector = Arc::clone(&self.connector);
        let response = match self
            .resilience
            .execute("swap", |_ctx| {
                let connector = Arc::clone(&connector);
                let request = request.clone();
                async move { connector.post_swap(request).await }
            })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.counters.rewind(keyset.id, counter_start).await;
                return Err(err);
            }
        };

        let fresh = construct_proofs(
            response.signatures,
            premint.rs(),
            premint.secrets(),
            &keys,
        )?;

        let received = fresh.total_amount()?;
        self.proofs.add_proofs(fresh).await?;
        Ok(received)
    }

    // --- Melt -----------------------------------------------------------

    /// Request a melt quote for a bolt11 invoice
    pub async fn melt_quote(&self, invoice: Bolt11Invoice) -> Result<MeltQuote, Error> {
        let request = MeltQuoteBolt11Request {
            request: invoice,
            unit: self.unit.clone(),
        };

        if !request.validate() {
            return Err(Error::InvalidAmount);
        }

        let invoice_str = request.request.to_string();

        let connector = Arc::clone(&self.connector);
        let response = self
            .resilience
            .execute("melt_quote", |_ctx| {
                let connector = Arc::clone(&connector);
                let request = request.clone();
                async move { connector.post_melt_quote(request).await }
            })
            .await?;

        let quote = MeltQuote {
            id: response.quote.clone(),
            unit: self.unit.clone(),
            amount: response.amount,
            request: invoice_str,
            fee_reserve: response.fee_reserve,
            state: response.state,
            expiry: response.expiry,
            payment_preimage: response.payment_preimage,
        };

        self.melt_quotes
            .write()
            .await
            .insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    /// Validate the melt rule for a quote against a set of inputs
    ///
    /// Total input value must cover amount plus fee reserve, the quote
    /// must be unexpired and in a payable state, and all inputs must be
    /// well formed.
    pub fn validate_melt(quote: &MeltQuote, inputs: &Proofs) -> Result<(), Error> {
        if quote.expired() {
            return Err(Error::QuoteExpired);
        }

        match quote.state {
            MeltQuoteState::Unpaid => {}
            MeltQuoteState::Pending => return Err(Error::QuotePending),
            MeltQuoteState::Paid => return Err(Error::TokenAlreadyUsed),
        }

        let required = quote
            .amount
            .checked_add(quote.fee_reserve)
            .ok_or(Error::AmountTooLarge)?;

        let total = inputs.total_amount()?;
        if total < required {
            return Err(Error::BalanceInsufficient);
        }

        for proof in inputs {
            if proof.amount == Amount::ZERO {
                return Err(Error::InvalidAmount);
            }
            if proof.secret.as_bytes().is_empty() {
                return Err(Error::InvalidSecret);
            }
        }

        Ok(())
    }

    /// Melt proofs to pay the quoted invoice
    pub async fn melt(&self, quote_id: &str) -> Result<MeltQuoteBolt11Response, Error> {
        let xpriv = self.require_xpriv().await?;

        let quote = self
            .melt_quotes
            .read()
            .await
            .get(quote_id)
            .cloned()
            .ok_or(Error::QuoteNotFound)?;

        let required = quote
            .amount
            .checked_add(quote.fee_reserve)
            .ok_or(Error::AmountTooLarge)?;

        // Inputs must hit the required amount exactly, or overpayment
        // beyond what the blank change outputs can carry would be lost
        let selected = self.proofs.select_proofs(required, None).await?;
        let inputs = if selected.total_amount()? == required {
            selected
        } else {
            let exact = self.swap(required).await?;
            self.proofs.store().store(exact.clone()).await?;
            exact
        };

        Self::validate_melt(&quote, &inputs)?;

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        self.proofs.store().mark_pending_spent(&inputs).await?;

        // Blank outputs for NUT-08 fee return, derived deterministically
        let change_reserve = quote.fee_reserve.max(Amount::from(1));
        let premint_count = change_reserve.split().len() as u32;
        let counter_start = self.counters.increment(keyset.id, premint_count).await;

        let result: Result<(MeltQuoteBolt11Response, PreMintSecrets), Error> = async {
            let mut premint = PreMintSecrets::from_xpriv(
                keyset.id,
                counter_start,
                xpriv,
                change_reserve,
                &SplitTarget::None,
            )
            .map_err(Error::from)?;

            // Blank outputs carry zero amounts; the mint assigns values
            for pre in premint.secrets.iter_mut() {
                pre.amount = Amount::ZERO;
                pre.blinded_message.amount = Amount::ZERO;
            }

            let mut request = MeltRequest::new(
                quote_id.to_string(),
                inputs.clone(),
                Some(premint.blinded_messages()),
            );
            if let Some(token) = self.access_token_for("/v1/melt/bolt11").await? {
                request.access_token = Some(token);
            }

            let connector = Arc::clone(&self.connector);
            let response = self
                .resilience
                .execute("melt", |_ctx| {
                    let connector = Arc::clone(&connector);
                    let request = request.clone();
                    async move { connector.post_melt(request).await }
                })
                .await?;

            Ok((response, premint))
        }
        .await;

        let (response, premint) = match result {
            Ok(ok) => ok,
            Err(err) => {
                self.counters.rewind(keyset.id, counter_start).await;
                self.proofs.store().rollback_pending_spent(&inputs).await?;
                return Err(err);
            }
        };

        match response.state {
            MeltQuoteState::Paid => {
                self.proofs.store().finalize_pending_spent(&inputs).await?;

                // Unblind returned change, which the mint signs in output
                // order
                if let Some(change) = response.change.clone() {
                    let count = change.len();
                    let rs = premint.rs().into_iter().take(count).collect();
                    let secrets = premint.secrets().into_iter().take(count).collect();

                    let change_proofs = construct_proofs(change, rs, secrets, &keys)?;
                    self.proofs.add_proofs(change_proofs).await?;
                }

                if let Some(stored) = self.melt_quotes.write().await.get_mut(quote_id) {
                    stored.state = MeltQuoteState::Paid;
                    stored.payment_preimage = response.payment_preimage.clone();
                }

                Ok(response)
            }
            MeltQuoteState::Pending => {
                // Leave the inputs pending; reconcile_pending settles them
                // once the payment resolves
                if let Some(stored) = self.melt_quotes.write().await.get_mut(quote_id) {
                    stored.state = MeltQuoteState::Pending;
                }
                Ok(response)
            }
            MeltQuoteState::Unpaid => {
                self.counters.rewind(keyset.id, counter_start).await;
                self.proofs.store().rollback_pending_spent(&inputs).await?;
                Err(Error::QuotePending)
            }
        }
    }

    // --- Proof state ----------------------------------------------------

    /// Check the mint-side state of proofs, keyed on their Y values
    pub async fn check_proofs_spent(&self, proofs: &Proofs) -> Result<Vec<State>, Error> {
        let request = CheckStateRequest { ys: proofs.ys()? };

        let connector = Arc::clone(&self.connector);
        let response = self
            .resilience
            .execute("checkstate", |_ctx| {
                let connector = Arc::clone(&connector);
                let request = request.clone();
                async move { connector.post_check_state(request).await }
            })
            .await?;

        if response.states.len() != request.ys.len() {
            return Err(Error::MismatchedArrayLengths);
        }

        Ok(response.states.into_iter().map(|s| s.state).collect())
    }

    /// Settle pending proofs against the mint's view
    ///
    /// Spent proofs are finalized, unspent proofs rolled back; proofs the
    /// mint reports pending stay reserved. Proof-state notifications from
    /// the subscription core feed the same path.
    pub async fn reconcile_pending(&self) -> Result<(), Error> {
        let pending = self.proofs.store().get_pending_spent().await?;
        if pending.is_empty() {
            return Ok(());
        }

        let states = self.check_proofs_spent(&pending).await?;

        for (proof, state) in pending.into_iter().zip(states) {
            let single = vec![proof];
            match state {
                State::Spent => self.proofs.store().finalize_pending_spent(&single).await?,
                State::Unspent => self.proofs.store().rollback_pending_spent(&single).await?,
                State::Pending => {}
            }
        }

        Ok(())
    }

    /// Apply a proof-state update for a single Y value
    pub async fn apply_proof_state(
        &self,
        y: cashukit::nuts::PublicKey,
        state: State,
    ) -> Result<(), Error> {
        let pending = self.proofs.store().get_pending_spent().await?;

        for proof in pending {
            if proof.y()? == y {
                let single = vec![proof];
                match state {
                    State::Spent => {
                        self.proofs.store().finalize_pending_spent(&single).await?
                    }
                    State::Unspent => {
                        self.proofs.store().rollback_pending_spent(&single).await?
                    }
                    State::Pending => {}
                }
                return Ok(());
            }
        }

        Ok(())
    }

    // --- Restore --------------------------------------------------------

    /// Restore proofs from the seed via NUT-09
    ///
    /// Walks counter windows per keyset until a window returns nothing,
    /// filters out spent proofs via checkstate, and advances the counter
    /// ledger past the last used counter.
    pub async fn restore(&self) -> Result<Amount, Error> {
        let xpriv = self.require_xpriv().await?;

        let keyset_ids: Vec<Id> = self.keysets.read().await.keys().copied().collect();
        let mut restored_total = Amount::ZERO;

        for keyset_id in keyset_ids {
            let keys = self.keys_for(keyset_id).await?;
            let mut start: u32 = 0;

            loop {
                let premint = PreMintSecrets::restore_batch(
                    keyset_id,
                    xpriv,
                    start,
                    start + RESTORE_BATCH - 1,
                )
                .map_err(Error::from)?;

                let request = RestoreRequest {
                    outputs: premint.blinded_messages(),
                };

                let connector = Arc::clone(&self.connector);
                let response = self
                    .resilience
                    .execute("restore", |_ctx| {
                        let connector = Arc::clone(&connector);
                        let request = request.clone();
                        async move { connector.post_restore(request).await }
                    })
                    .await?;

                if !response.validate() {
                    return Err(Error::MismatchedArrayLengths);
                }

                if response.signatures.is_empty() {
                    break;
                }

                // Match returned outputs back to their premint entries
                let mut rs = Vec::with_capacity(response.outputs.len());
                let mut secrets = Vec::with_capacity(response.outputs.len());
                let mut last_counter = start;

                for output in &response.outputs {
                    let position = premint
                        .iter()
                        .position(|pre| {
                            pre.blinded_message.blinded_secret == output.blinded_secret
                        })
                        .ok_or(Error::InvalidResponse)?;

                    let pre = &premint.secrets[position];
                    rs.push(pre.r.clone());
                    secrets.push(pre.secret.clone());
                    last_counter = last_counter.max(start + position as u32);
                }

                let proofs = construct_proofs(response.signatures, rs, secrets, &keys)?;

                // Keep only what the mint still considers unspent
                let states = self.check_proofs_spent(&proofs).await?;
                let unspent: Proofs = proofs
                    .into_iter()
                    .zip(states)
                    .filter(|(_, state)| *state == State::Unspent)
                    .map(|(proof, _)| proof)
                    .collect();

                restored_total = restored_total
                    .checked_add(unspent.total_amount()?)
                    .ok_or(Error::AmountTooLarge)?;

                self.proofs.store().store(unspent).await?;
                self.counters.set(keyset_id, last_counter + 1).await;

                start += RESTORE_BATCH;
            }
        }

        Ok(restored_total)
    }
}

/// Split `proofs` into an exact subset summing to `amount` and the rest
fn partition_exact(proofs: Proofs, amount: Amount) -> Result<(Proofs, Proofs), Error> {
    let mut sorted = proofs;
    sorted.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut send = Vec::new();
    let mut change = Vec::new();
    let mut remaining = amount;

    for proof in sorted {
        if proof.amount <= remaining {
            remaining -= proof.amount;
            send.push(proof);
        } else {
            change.push(proof);
        }
    }

    if remaining != Amount::ZERO {
        return Err(Error::InvalidProofSet);
    }

    Ok((send, change))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use cashukit::nuts::{Proof, PublicKey};
    use cashukit::secret::Secret;

    use super::*;

    fn proof(amount: u64) -> Proof {
        Proof::new(
            Amount::from(amount),
            Id::from_str("009a1f293253e41e").unwrap(),
            Secret::generate(),
            PublicKey::from_str(
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
            )
            .unwrap(),
        )
    }

    fn quote(state: MeltQuoteState, expiry: u64) -> MeltQuote {
        MeltQuote {
            id: "quote".to_string(),
            unit: CurrencyUnit::Sat,
            amount: Amount::from(10),
            request: "lnbc".to_string(),
            fee_reserve: Amount::from(1),
            state,
            expiry,
            payment_preimage: None,
        }
    }

    #[test]
    fn test_validate_melt_rule() {
        let future = unix_time() + 3600;
        let inputs = vec![proof(8), proof(4)];

        // 12 >= 10 + 1
        assert!(WalletSession::validate_melt(&quote(MeltQuoteState::Unpaid, future), &inputs).is_ok());

        // Insufficient inputs
        let small = vec![proof(8)];
        assert!(matches!(
            WalletSession::validate_melt(&quote(MeltQuoteState::Unpaid, future), &small),
            Err(Error::BalanceInsufficient)
        ));

        // Expired quote
        assert!(matches!(
            WalletSession::validate_melt(&quote(MeltQuoteState::Unpaid, 1), &inputs),
            Err(Error::QuoteExpired)
        ));

        // Not in a payable state
        assert!(matches!(
            WalletSession::validate_melt(&quote(MeltQuoteState::Pending, future), &inputs),
            Err(Error::QuotePending)
        ));
        assert!(matches!(
            WalletSession::validate_melt(&quote(MeltQuoteState::Paid, future), &inputs),
            Err(Error::TokenAlreadyUsed)
        ));

        // Malformed input proof
        let bad = vec![proof(8), proof(4), proof(0)];
        assert!(matches!(
            WalletSession::validate_melt(&quote(MeltQuoteState::Unpaid, future), &bad),
            Err(Error::InvalidAmount)
        ));
    }

    #[test]
    fn test_partition_exact() {
        let proofs = vec![proof(1), proof(2), proof(4), proof(8)];

        let (send, change) = partition_exact(proofs, Amount::from(5)).unwrap();
        assert_eq!(send.total_amount().unwrap(), Amount::from(5));
        assert_eq!(change.total_amount().unwrap(), Amount::from(10));

        // No exact subset
        let proofs = vec![proof(4), proof(8)];
        assert!(partition_exact(proofs, Amount::from(5)).is_err());
    }
}
