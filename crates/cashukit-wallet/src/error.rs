//! Errors
//!
//! Every error carries its category, a stable code string and a
//! retryability flag so consumers can key off the category without parsing
//! messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cashukit::nuts::Id;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Cryptographic operations
    Cryptographic,
    /// Protocol rules
    Protocol,
    /// Input validation
    Validation,
    /// Wallet state
    Wallet,
    /// Network and transport
    Network,
    /// Storage backends
    Storage,
}

/// Wallet Error
#[derive(Debug, Error)]
pub enum Error {
    // Cryptographic
    /// Point is not on the curve
    #[error("Invalid point")]
    InvalidPoint,
    /// Scalar is zero or not less than the curve order
    #[error("Invalid scalar")]
    InvalidScalar,
    /// Secret is not the expected length
    #[error("Invalid secret length")]
    InvalidSecretLength,
    /// Hash to curve exhausted its search ceiling
    #[error("Hash to curve failed")]
    HashToCurveFailed,
    /// Message could not be blinded
    #[error("Blinding failed")]
    BlindingFailed,
    /// Signature could not be unblinded
    #[error("Unblinding failed")]
    UnblindingFailed,
    /// Signature verification failed
    #[error("Verification failed")]
    VerificationFailed,
    /// Key generation failed
    #[error("Key generation failed")]
    KeyGenerationFailed,
    /// No blinding factor stored for an unblind operation
    #[error("Missing blinding factor")]
    MissingBlindingFactor,
    /// Hex string could not be parsed
    #[error("Invalid hex string")]
    InvalidHexString,

    // Protocol
    /// Keyset id is malformed
    #[error("Invalid keyset id")]
    InvalidKeysetId,
    /// Keyset is not known
    #[error("Keyset not found: `{0}`")]
    KeysetNotFound(Id),
    /// Keyset is past its final expiry
    #[error("Keyset expired")]
    KeysetExpired,
    /// Keyset is inactive
    #[error("Keyset inactive")]
    KeysetInactive,
    /// Mint advertises no active keyset for the unit
    #[error("No active keyset")]
    NoActiveKeyset,
    /// Unit is not supported
    #[error("Invalid unit")]
    InvalidUnit,
    /// Amount is not a supported denomination
    #[error("Invalid denomination")]
    InvalidDenomination,
    /// Derivation path could not be constructed
    #[error("Invalid derivation path")]
    InvalidDerivationPath,
    /// Protocol version is not supported
    #[error("Unsupported version")]
    UnsupportedVersion,
    /// NUT version is not supported
    #[error("Invalid nut version")]
    InvalidNutVersion,
    /// Operation is not implemented
    #[error("Not implemented")]
    NotImplemented,
    /// Mnemonic failed checksum or wordlist validation
    #[error("Invalid mnemonic")]
    InvalidMnemonic,
    /// Entropy length is not one of 16, 20, 24, 28 or 32 bytes
    #[error("Invalid entropy")]
    InvalidEntropy,
    /// Secret is malformed
    #[error("Invalid secret")]
    InvalidSecret,
    /// Paired arrays have different lengths
    #[error("Mismatched array lengths")]
    MismatchedArrayLengths,
    /// HTLC preimage does not match the hash lock
    #[error("Invalid preimage")]
    InvalidPreimage,
    /// Refund branch used before the locktime
    #[error("Locktime not expired")]
    LocktimeNotExpired,
    /// Proof is not of the expected kind
    #[error("Invalid proof type")]
    InvalidProofType,
    /// Witness does not satisfy the spending condition
    #[error("Invalid witness")]
    InvalidWitness,
    /// Quote is still pending
    #[error("Quote pending")]
    QuotePending,
    /// Quote has expired
    #[error("Quote expired")]
    QuoteExpired,
    /// Quote is not known
    #[error("Quote not found")]
    QuoteNotFound,

    // Validation
    /// Token prefix or encoding is malformed
    #[error("Invalid token format")]
    InvalidTokenFormat,
    /// Token decodes but its structure is invalid
    #[error("Invalid token structure")]
    InvalidTokenStructure,
    /// Token is invalid
    #[error("Invalid token")]
    InvalidToken,
    /// Token has already been spent
    #[error("Token already spent")]
    TokenAlreadySpent,
    /// Token has already been used
    #[error("Token already used")]
    TokenAlreadyUsed,
    /// Token has expired
    #[error("Token expired")]
    TokenExpired,
    /// Proof failed validation
    #[error("Invalid proof")]
    InvalidProof,
    /// Proof is already present in the store
    #[error("Duplicate proof")]
    DuplicateProof,
    /// Signature on the proof is not a valid curve point or does not verify
    #[error("Invalid signature")]
    InvalidSignature,
    /// Token is not known
    #[error("Token not found")]
    TokenNotFound,
    /// Amount is zero or otherwise invalid
    #[error("Invalid amount")]
    InvalidAmount,
    /// Amount exceeds what can be represented
    #[error("Amount too large")]
    AmountTooLarge,
    /// Amount is below the allowed minimum
    #[error("Amount too small")]
    AmountTooSmall,
    /// A required field is missing
    #[error("Missing required field: `{0}`")]
    MissingRequiredField(String),
    /// JSON could not be encoded
    #[error("Json encoding error")]
    JsonEncodingError,
    /// JSON could not be decoded
    #[error("Json decoding error")]
    JsonDecodingError,
    /// Hex could not be decoded
    #[error("Hex decoding error")]
    HexDecodingError,
    /// Base64 could not be decoded
    #[error("Base64 decoding error")]
    Base64DecodingError,
    /// Serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Wallet
    /// Wallet has not been initialized
    #[error("Wallet not initialized")]
    WalletNotInitialized,
    /// Wallet has already been initialized
    #[error("Wallet already initialized")]
    WalletAlreadyInitialized,
    /// Wallet was initialized without a mnemonic
    #[error("Wallet not initialized with mnemonic")]
    WalletNotInitializedWithMnemonic,
    /// Proof set is inconsistent
    #[error("Invalid proof set")]
    InvalidProofSet,
    /// Proof has already been spent
    #[error("Proof already spent")]
    ProofAlreadySpent,
    /// Proof is not in the store
    #[error("Proof not found")]
    ProofNotFound,
    /// Available balance is below the requested amount
    #[error("Balance insufficient")]
    BalanceInsufficient,
    /// No proofs are available to spend
    #[error("No spendable proofs")]
    NoSpendableProofs,
    /// Wallet is in a state that forbids the operation
    #[error("Invalid wallet state")]
    InvalidWalletState,
    /// No data in the keychain
    #[error("No keychain data")]
    NoKeychainData,
    /// A state transition was not legal
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Network
    /// Generic network error
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Mint URL is invalid
    #[error("Invalid mint url")]
    InvalidMintURL,
    /// Mint could not be reached
    #[error("Mint unavailable")]
    MintUnavailable,
    /// Response could not be interpreted
    #[error("Invalid response")]
    InvalidResponse,
    /// Rate limit was exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    /// HTTP error status
    #[error("Http error `{code}`: {detail}")]
    HttpError {
        /// HTTP status code
        code: u16,
        /// Response detail
        detail: String,
    },
    /// Connection failed
    #[error("Connection failed")]
    ConnectionFailed,
    /// Temporary failure, safe to retry
    #[error("Temporary failure")]
    TemporaryFailure,
    /// Operation timed out
    #[error("Operation timeout")]
    OperationTimeout,
    /// Operation was cancelled
    #[error("Operation cancelled")]
    OperationCancelled,

    // Storage
    /// Storage backend error
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl Error {
    /// Category of the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPoint
            | Self::InvalidScalar
            | Self::InvalidSecretLength
            | Self::HashToCurveFailed
            | Self::BlindingFailed
            | Self::UnblindingFailed
            | Self::VerificationFailed
            | Self::KeyGenerationFailed
            | Self::MissingBlindingFactor
            | Self::InvalidHexString => ErrorCategory::Cryptographic,

            Self::InvalidKeysetId
            | Self::KeysetNotFound(_)
            | Self::KeysetExpired
            | Self::KeysetInactive
            | Self::NoActiveKeyset
            | Self::InvalidUnit
            | Self::InvalidDenomination
            | Self::InvalidDerivationPath
            | Self::UnsupportedVersion
            | Self::InvalidNutVersion
            | Self::NotImplemented
            | Self::InvalidMnemonic
            | Self::InvalidEntropy
            | Self::InvalidSecret
            | Self::MismatchedArrayLengths
            | Self::InvalidPreimage
            | Self::LocktimeNotExpired
            | Self::InvalidProofType
            | Self::InvalidWitness
            | Self::QuotePending
            | Self::QuoteExpired
            | Self::QuoteNotFound => ErrorCategory::Protocol,

            Self::InvalidTokenFormat
            | Self::InvalidTokenStructure
            | Self::InvalidToken
            | Self::TokenAlreadySpent
            | Self::TokenAlreadyUsed
            | Self::TokenExpired
            | Self::InvalidProof
            | Self::DuplicateProof
            | Self::InvalidSignature
            | Self::TokenNotFound
            | Self::InvalidAmount
            | Self::AmountTooLarge
            | Self::AmountTooSmall
            | Self::MissingRequiredField(_)
            | Self::JsonEncodingError
            | Self::JsonDecodingError
            | Self::HexDecodingError
            | Self::Base64DecodingError
            | Self::SerializationError(_) => ErrorCategory::Validation,

            Self::WalletNotInitialized
            | Self::WalletAlreadyInitialized
            | Self::WalletNotInitializedWithMnemonic
            | Self::InvalidProofSet
            | Self::ProofAlreadySpent
            | Self::ProofNotFound
            | Self::BalanceInsufficient
            | Self::NoSpendableProofs
            | Self::InvalidWalletState
            | Self::NoKeychainData
            | Self::InvalidState(_) => ErrorCategory::Wallet,

            Self::NetworkError(_)
            | Self::InvalidMintURL
            | Self::MintUnavailable
            | Self::InvalidResponse
            | Self::RateLimitExceeded
            | Self::HttpError { .. }
            | Self::ConnectionFailed
            | Self::TemporaryFailure
            | Self::OperationTimeout
            | Self::OperationCancelled => ErrorCategory::Network,

            Self::StorageError(_) => ErrorCategory::Storage,
        }
    }

    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPoint => "invalid_point",
            Self::InvalidScalar => "invalid_scalar",
            Self::InvalidSecretLength => "invalid_secret_length",
            Self::HashToCurveFailed => "hash_to_curve_failed",
            Self::BlindingFailed => "blinding_failed",
            Self::UnblindingFailed => "unblinding_failed",
            Self::VerificationFailed => "verification_failed",
            Self::KeyGenerationFailed => "key_generation_failed",
            Self::MissingBlindingFactor => "missing_blinding_factor",
            Self::InvalidHexString => "invalid_hex_string",
            Self::InvalidKeysetId => "invalid_keyset_id",
            Self::KeysetNotFound(_) => "keyset_not_found",
            Self::KeysetExpired => "keyset_expired",
            Self::KeysetInactive => "keyset_inactive",
            Self::NoActiveKeyset => "no_active_keyset",
            Self::InvalidUnit => "invalid_unit",
            Self::InvalidDenomination => "invalid_denomination",
            Self::InvalidDerivationPath => "invalid_derivation_path",
            Self::UnsupportedVersion => "unsupported_version",
            Self::InvalidNutVersion => "invalid_nut_version",
            Self::NotImplemented => "not_implemented",
            Self::InvalidMnemonic => "invalid_mnemonic",
            Self::InvalidEntropy => "invalid_entropy",
            Self::InvalidSecret => "invalid_secret",
            Self::MismatchedArrayLengths => "mismatched_array_lengths",
            Self::InvalidPreimage => "invalid_preimage",
            Self::LocktimeNotExpired => "locktime_not_expired",
            Self::InvalidProofType => "invalid_proof_type",
            Self::InvalidWitness => "invalid_witness",
            Self::QuotePending => "quote_pending",
            Self::QuoteExpired => "quote_expired",
            Self::QuoteNotFound => "quote_not_found",
            Self::InvalidTokenFormat => "invalid_token_format",
            Self::InvalidTokenStructure => "invalid_token_structure",
            Self::InvalidToken => "invalid_token",
            Self::TokenAlreadySpent => "token_already_spent",
            Self::TokenAlreadyUsed => "token_already_used",
            Self::TokenExpired => "token_expired",
            Self::InvalidProof => "invalid_proof",
            Self::DuplicateProof => "duplicate_proof",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenNotFound => "token_not_found",
            Self::InvalidAmount => "invalid_amount",
            Self::AmountTooLarge => "amount_too_large",
            Self::AmountTooSmall => "amount_too_small",
            Self::MissingRequiredField(_) => "missing_required_field",
            Self::JsonEncodingError => "json_encoding_error",
            Self::JsonDecodingError => "json_decoding_error",
            Self::HexDecodingError => "hex_decoding_error",
            Self::Base64DecodingError => "base64_decoding_error",
            Self::SerializationError(_) => "serialization_error",
            Self::WalletNotInitialized => "wallet_not_initialized",
            Self::WalletAlreadyInitialized => "wallet_already_initialized",
            Self::WalletNotInitializedWithMnemonic => "wallet_not_initialized_with_mnemonic",
            Self::InvalidProofSet => "invalid_proof_set",
            Self::ProofAlreadySpent => "proof_already_spent",
            Self::ProofNotFound => "proof_not_found",
            Self::BalanceInsufficient => "balance_insufficient",
            Self::NoSpendableProofs => "no_spendable_proofs",
            Self::InvalidWalletState => "invalid_wallet_state",
            Self::NoKeychainData => "no_keychain_data",
            Self::InvalidState(_) => "invalid_state",
            Self::NetworkError(_) => "network_error",
            Self::InvalidMintURL => "invalid_mint_url",
            Self::MintUnavailable => "mint_unavailable",
            Self::InvalidResponse => "invalid_response",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::HttpError { .. } => "http_error",
            Self::ConnectionFailed => "connection_failed",
            Self::TemporaryFailure => "temporary_failure",
            Self::OperationTimeout => "operation_timeout",
            Self::OperationCancelled => "operation_cancelled",
            Self::StorageError(_) => "storage_error",
        }
    }

    /// Whether the operation may be retried
    ///
    /// Retryable: network timeout, mint unavailable, rate limit, connection
    /// failure, temporary failure, quote pending, HTTP 5xx and HTTP 429.
    /// Everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OperationTimeout
            | Self::MintUnavailable
            | Self::RateLimitExceeded
            | Self::ConnectionFailed
            | Self::TemporaryFailure
            | Self::QuotePending => true,
            Self::HttpError { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Optional recovery suggestion
    pub fn recovery(&self) -> Option<&'static str> {
        match self {
            Self::BalanceInsufficient => Some("Receive or mint more ecash before spending"),
            Self::ProofAlreadySpent => Some("Remove the spent proofs from the wallet"),
            Self::QuotePending => Some("Wait for the quote to settle and retry"),
            Self::QuoteExpired => Some("Request a new quote"),
            Self::RateLimitExceeded => Some("Back off before sending further requests"),
            Self::WalletNotInitialized => Some("Initialize the wallet with a mnemonic or seed"),
            Self::InvalidMnemonic => Some("Check the mnemonic words and checksum"),
            _ => None,
        }
    }
}

/// Error response from the mint
///
/// `{ "detail": string, "code": integer }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error detail
    pub detail: String,
    /// Error code
    #[serde(default)]
    pub code: i32,
}

impl ErrorResponse {
    /// Parse an [`ErrorResponse`] from a JSON string, wrapping anything
    /// unparseable as the detail itself
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|_| ErrorResponse {
            detail: json.to_string(),
            code: 0,
        })
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code: {}, detail: {}", self.code, self.detail)
    }
}

impl From<ErrorResponse> for Error {
    fn from(err: ErrorResponse) -> Error {
        match err.code {
            10003 => Error::VerificationFailed,
            11001 => Error::TokenAlreadySpent,
            11002 => Error::InvalidProofSet,
            11005 => Error::InvalidUnit,
            11006 => Error::AmountTooLarge,
            12001 => Error::InvalidKeysetId,
            12002 => Error::KeysetInactive,
            20005 => Error::QuotePending,
            20007 => Error::QuoteExpired,
            _ => Error::NetworkError(err.to_string()),
        }
    }
}

impl From<cashukit::dhke::Error> for Error {
    fn from(err: cashukit::dhke::Error) -> Error {
        match err {
            cashukit::dhke::Error::HashToCurveFailed => Error::HashToCurveFailed,
            cashukit::dhke::Error::TokenNotVerified => Error::VerificationFailed,
            cashukit::dhke::Error::AmountKey => Error::InvalidDenomination,
            cashukit::dhke::Error::Secp256k1(_) => Error::InvalidPoint,
            cashukit::dhke::Error::NUT01(_) => Error::InvalidPoint,
        }
    }
}

impl From<cashukit::nuts::nut01::Error> for Error {
    fn from(_: cashukit::nuts::nut01::Error) -> Error {
        Error::InvalidPoint
    }
}

impl From<cashukit::nuts::nut02::Error> for Error {
    fn from(_: cashukit::nuts::nut02::Error) -> Error {
        Error::InvalidKeysetId
    }
}

impl From<cashukit::nuts::nut00::Error> for Error {
    fn from(err: cashukit::nuts::nut00::Error) -> Error {
        use cashukit::nuts::nut00::Error as Nut00Error;
        match err {
            Nut00Error::ProofsRequired => Error::InvalidTokenStructure,
            Nut00Error::UnsupportedToken => Error::InvalidTokenFormat,
            Nut00Error::UnsupportedUnit => Error::InvalidUnit,
            Nut00Error::DuplicateProofs => Error::InvalidProofSet,
            Nut00Error::Base64Error(_) => Error::Base64DecodingError,
            Nut00Error::SerdeJsonError(_) => Error::JsonDecodingError,
            Nut00Error::Utf8ParseError(_) => Error::InvalidTokenFormat,
            Nut00Error::CiboriumError(_) | Nut00Error::CiboriumSerError(_) => {
                Error::InvalidTokenFormat
            }
            Nut00Error::Amount(_) => Error::AmountTooLarge,
            Nut00Error::Secret(_) => Error::InvalidSecret,
            Nut00Error::DHKE(e) => e.into(),
            Nut00Error::NUT10(_) => Error::InvalidSecret,
            Nut00Error::NUT11(_) => Error::InvalidWitness,
            Nut00Error::NUT02(_) => Error::InvalidKeysetId,
            Nut00Error::UnsupportedPaymentMethod => Error::NotImplemented,
        }
    }
}

impl From<cashukit::nuts::nut11::Error> for Error {
    fn from(err: cashukit::nuts::nut11::Error) -> Error {
        use cashukit::nuts::nut11::Error as Nut11Error;
        match err {
            Nut11Error::LocktimeInPast => Error::LocktimeNotExpired,
            _ => Error::InvalidWitness,
        }
    }
}

impl From<cashukit::nuts::nut14::Error> for Error {
    fn from(err: cashukit::nuts::nut14::Error) -> Error {
        use cashukit::nuts::nut14::Error as Nut14Error;
        match err {
            Nut14Error::Preimage => Error::InvalidPreimage,
            _ => Error::InvalidWitness,
        }
    }
}

impl From<cashukit::nuts::nut13::Error> for Error {
    fn from(_: cashukit::nuts::nut13::Error) -> Error {
        Error::InvalidDerivationPath
    }
}

impl From<cashukit::nuts::nut20::Error> for Error {
    fn from(_: cashukit::nuts::nut20::Error) -> Error {
        Error::VerificationFailed
    }
}

impl From<cashukit::nuts::nut22::Error> for Error {
    fn from(_: cashukit::nuts::nut22::Error) -> Error {
        Error::MissingRequiredField("access_token".to_string())
    }
}

impl From<cashukit::amount::Error> for Error {
    fn from(_: cashukit::amount::Error) -> Error {
        Error::AmountTooLarge
    }
}

impl From<cashukit::fees::Error> for Error {
    fn from(err: cashukit::fees::Error) -> Error {
        match err {
            cashukit::fees::Error::KeysetNotFound(id) => Error::KeysetNotFound(id),
            cashukit::fees::Error::Amount(_) => Error::AmountTooLarge,
        }
    }
}

impl From<cashukit::secret::Error> for Error {
    fn from(_: cashukit::secret::Error) -> Error {
        Error::InvalidSecret
    }
}

impl From<cashukit::mint_url::Error> for Error {
    fn from(_: cashukit::mint_url::Error) -> Error {
        Error::InvalidMintURL
    }
}

impl From<cashukit::util::hex::Error> for Error {
    fn from(_: cashukit::util::hex::Error) -> Error {
        Error::HexDecodingError
    }
}

impl From<bip39::Error> for Error {
    fn from(err: bip39::Error) -> Error {
        match err {
            bip39::Error::BadEntropyBitCount(_) => Error::InvalidEntropy,
            _ => Error::InvalidMnemonic,
        }
    }
}

impl From<bitcoin::bip32::Error> for Error {
    fn from(_: bitcoin::bip32::Error) -> Error {
        Error::InvalidDerivationPath
    }
}

impl From<serde_json::Error> for Error {
    fn from(_: serde_json::Error) -> Error {
        Error::JsonDecodingError
    }
}
