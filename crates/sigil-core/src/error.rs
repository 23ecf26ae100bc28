//! Error types for the Sigil signing core.
//!
//! Errors are organized by the component that raises them:
//!
//! - [`AddressError`] - Address codec failures (bech32, hex, key mismatch)
//! - [`EncodeError`] - Payload encoding and validation failures
//! - [`ResolveError`] - Fee and nonce resolution failures
//! - [`SignError`] - External signer and key failures
//! - [`RecoveryError`] - Signature recovery failures
//! - [`BroadcastError`] - Broadcast failures
//! - [`ConfigError`] - Configuration failures
//! - [`SigilError`] - Top-level error that wraps all of the above
//!
//! Every error maps onto an [`ErrorKind`], which drives the retry and
//! user-facing messaging policy:
//!
//! ```rust
//! use sigil_core::error::{ErrorKind, ResolveError, SigilError, EncodeError};
//!
//! let err: SigilError = ResolveError::account_not_ready("osmosis-1", "osmo1...", 3).into();
//! assert_eq!(err.kind(), ErrorKind::AccountNotReady);
//! assert!(err.kind().is_retryable());
//!
//! let err: SigilError = EncodeError::fee_fields_missing("maxFeePerGas").into();
//! assert!(!err.kind().is_retryable());
//! ```

use std::fmt;

/// Top-level error type for the Sigil signing core.
#[derive(Debug, thiserror::Error)]
pub enum SigilError {
    /// Address conversion or validation failed.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Payload encoding or validation failed.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Chain state resolution failed.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// The external signer failed or declined.
    #[error("Signing error: {0}")]
    Sign(#[from] SignError),

    /// Signature recovery failed.
    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    /// Broadcasting the signed envelope failed.
    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The requested chain is not registered.
    #[error("unknown chain: {chain_id}")]
    UnknownChain {
        /// The chain identifier that was requested.
        chain_id: String,
    },
}

impl SigilError {
    /// Create an `UnknownChain` error.
    #[must_use]
    pub fn unknown_chain(chain_id: impl Into<String>) -> Self {
        Self::UnknownChain {
            chain_id: chain_id.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Address(_) => ErrorKind::AddressFormat,
            Self::Encode(e) => e.kind(),
            Self::Resolve(e) => e.kind(),
            Self::Sign(e) => e.kind(),
            Self::Recovery(_) => ErrorKind::Recovery,
            Self::Broadcast(_) => ErrorKind::BroadcastFailure,
            Self::Config(_) => ErrorKind::Config,
            Self::UnknownChain { .. } => ErrorKind::UnknownChain,
        }
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// Coarse classification of every failure the core can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Textual or hex address could not be decoded or did not match.
    AddressFormat,
    /// Typed-data message does not match its schema.
    SchemaMismatch,
    /// EIP-1559 fee fields are missing.
    FeeFieldsMissing,
    /// Any other encoding or validation failure.
    InvalidPayload,
    /// The account does not exist on chain yet.
    AccountNotReady,
    /// The chain state provider failed.
    Provider,
    /// The user or device declined to sign.
    SignerRejected,
    /// The caller abandoned the request.
    Cancelled,
    /// The signer failed for a reason other than rejection.
    SignerFailed,
    /// Signature recovery failed.
    Recovery,
    /// The signed envelope could not be broadcast.
    BroadcastFailure,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// The chain is not registered.
    UnknownChain,
}

impl ErrorKind {
    /// Returns `true` for the single condition that is retried automatically.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::AccountNotReady)
    }

    /// Returns `true` when the failure came from the user declining or
    /// abandoning the request rather than from a fault.
    #[must_use]
    pub const fn is_user_rejection(self) -> bool {
        matches!(self, Self::SignerRejected | Self::Cancelled)
    }

    /// Stable snake-case name, used in structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddressFormat => "address_format",
            Self::SchemaMismatch => "schema_mismatch",
            Self::FeeFieldsMissing => "fee_fields_missing",
            Self::InvalidPayload => "invalid_payload",
            Self::AccountNotReady => "account_not_ready",
            Self::Provider => "provider",
            Self::SignerRejected => "signer_rejected",
            Self::Cancelled => "cancelled",
            Self::SignerFailed => "signer_failed",
            Self::Recovery => "recovery",
            Self::BroadcastFailure => "broadcast_failure",
            Self::Config => "config",
            Self::UnknownChain => "unknown_chain",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AddressError
// ============================================================================

/// Errors raised by the address codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The string is not valid bech32 (bad charset, mixed case, or checksum).
    #[error("invalid bech32 address {address}: {reason}")]
    InvalidBech32 {
        /// The offending address.
        address: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The human-readable prefix is not the one registered for the chain.
    #[error("address prefix mismatch: expected {expected}, got {actual}")]
    PrefixMismatch {
        /// Registered prefix.
        expected: String,
        /// Prefix found in the address.
        actual: String,
    },

    /// The decoded payload has the wrong length.
    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// The raw hex address could not be decoded.
    #[error("invalid hex address: {value}")]
    InvalidHex {
        /// The offending value.
        value: String,
    },

    /// The address does not belong to the expected public key.
    #[error("address {address} does not match the expected public key")]
    PublicKeyMismatch {
        /// The address that failed the check.
        address: String,
    },

    /// The public key bytes are not a valid secp256k1 point.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey {
        /// Decoder diagnostic.
        reason: String,
    },
}

impl AddressError {
    /// Create an `InvalidBech32` error.
    #[must_use]
    pub fn invalid_bech32(address: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidBech32 {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a `PrefixMismatch` error.
    #[must_use]
    pub fn prefix_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::PrefixMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an `InvalidHex` error.
    #[must_use]
    pub fn invalid_hex(value: impl Into<String>) -> Self {
        Self::InvalidHex {
            value: value.into(),
        }
    }

    /// Create a `PublicKeyMismatch` error.
    #[must_use]
    pub fn public_key_mismatch(address: impl Into<String>) -> Self {
        Self::PublicKeyMismatch {
            address: address.into(),
        }
    }

    /// Create an `InvalidPublicKey` error.
    #[must_use]
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// EncodeError
// ============================================================================

/// Errors raised while validating or encoding an unsigned intent.
///
/// These always indicate a caller bug and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Typed data references a type or field that is not declared.
    #[error("typed data schema mismatch: {context}")]
    SchemaMismatch {
        /// What did not match.
        context: String,
    },

    /// An EIP-1559 transaction lacks a fee field.
    #[error("EIP-1559 fee field missing: {field}")]
    FeeFieldsMissing {
        /// The missing field.
        field: String,
    },

    /// An EIP-2930 transaction has no access list at all.
    #[error("EIP-2930 transaction requires an access list")]
    AccessListMissing,

    /// A legacy or EIP-2930 transaction has no gas price.
    #[error("{kind} transaction requires a gas price")]
    GasPriceMissing {
        /// The transaction kind.
        kind: String,
    },

    /// The intent does not belong to the chain's family.
    #[error("{intent} intent cannot be encoded for {family} chain {chain_id}")]
    FamilyMismatch {
        /// Chain identifier.
        chain_id: String,
        /// Chain family name.
        family: String,
        /// Intent variant name.
        intent: String,
    },

    /// A signed envelope could not be decoded or does not match the request.
    #[error("malformed envelope: {context}")]
    MalformedEnvelope {
        /// What was wrong.
        context: String,
    },

    /// A field value is out of range or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Why it is invalid.
        reason: String,
    },
}

impl EncodeError {
    /// Create a `SchemaMismatch` error.
    #[must_use]
    pub fn schema_mismatch(context: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            context: context.into(),
        }
    }

    /// Create a `FeeFieldsMissing` error.
    #[must_use]
    pub fn fee_fields_missing(field: impl Into<String>) -> Self {
        Self::FeeFieldsMissing {
            field: field.into(),
        }
    }

    /// Create a `GasPriceMissing` error.
    #[must_use]
    pub fn gas_price_missing(kind: impl Into<String>) -> Self {
        Self::GasPriceMissing { kind: kind.into() }
    }

    /// Create a `FamilyMismatch` error.
    #[must_use]
    pub fn family_mismatch(
        chain_id: impl Into<String>,
        family: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self::FamilyMismatch {
            chain_id: chain_id.into(),
            family: family.into(),
            intent: intent.into(),
        }
    }

    /// Create a `MalformedEnvelope` error.
    #[must_use]
    pub fn malformed_envelope(context: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            context: context.into(),
        }
    }

    /// Create an `InvalidField` error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::FeeFieldsMissing { .. } => ErrorKind::FeeFieldsMissing,
            _ => ErrorKind::InvalidPayload,
        }
    }
}

// ============================================================================
// ResolveError
// ============================================================================

/// Errors raised while fetching mutable chain state.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The account is not available yet and the retry ceiling was reached.
    #[error("account {address} on {chain_id} not ready after {attempts} attempts")]
    AccountNotReady {
        /// Chain identifier.
        chain_id: String,
        /// Account address.
        address: String,
        /// How many attempts were made.
        attempts: u32,
    },

    /// The provider returned an error or an unreadable response.
    #[error("chain state provider failed: {context}")]
    Provider {
        /// Provider diagnostic.
        context: String,
    },

    /// The caller cancelled while state was being resolved.
    #[error("state resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Create an `AccountNotReady` error.
    #[must_use]
    pub fn account_not_ready(
        chain_id: impl Into<String>,
        address: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::AccountNotReady {
            chain_id: chain_id.into(),
            address: address.into(),
            attempts,
        }
    }

    /// Create a `Provider` error.
    #[must_use]
    pub fn provider(context: impl Into<String>) -> Self {
        Self::Provider {
            context: context.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotReady { .. } => ErrorKind::AccountNotReady,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

// ============================================================================
// SignError
// ============================================================================

/// Errors raised by the external signer or by local key handling.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The user or device declined the request.
    #[error("signer rejected the request: {reason}")]
    SignerRejected {
        /// Reason reported by the signer.
        reason: String,
    },

    /// The signer failed.
    #[error("signer failed: {context}")]
    SignerFailed {
        /// Signer diagnostic.
        context: String,
    },

    /// The caller cancelled while waiting for the signer.
    #[error("signing cancelled")]
    Cancelled,

    /// The secret key material is invalid.
    #[error("invalid key material")]
    InvalidKey,

    /// The cryptographic signing operation failed.
    #[error("signature failed: {context}")]
    SignatureFailed {
        /// What failed.
        context: String,
    },
}

impl SignError {
    /// Create a `SignerRejected` error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::SignerRejected {
            reason: reason.into(),
        }
    }

    /// Create a `SignerFailed` error.
    #[must_use]
    pub fn failed(context: impl Into<String>) -> Self {
        Self::SignerFailed {
            context: context.into(),
        }
    }

    /// Create a `SignatureFailed` error.
    #[must_use]
    pub fn signature_failed(context: impl Into<String>) -> Self {
        Self::SignatureFailed {
            context: context.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SignerRejected { .. } => ErrorKind::SignerRejected,
            Self::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::SignerFailed,
        }
    }
}

// ============================================================================
// RecoveryError
// ============================================================================

/// Errors raised while recovering a public key from a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    /// The signature bytes have the wrong length or invalid scalars.
    #[error("malformed signature: {context}")]
    MalformedSignature {
        /// What was wrong.
        context: String,
    },

    /// The recovery byte is not 0, 1, 27 or 28.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// No public key could be recovered for the digest.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// The signed document could not be hashed.
    #[error("cannot hash signed document: {context}")]
    InvalidDocument {
        /// What was wrong.
        context: String,
    },

    /// The signature is valid but belongs to someone else.
    #[error("signature recovers to {recovered}, expected {expected}")]
    IdentityMismatch {
        /// The identity the request was made for.
        expected: String,
        /// The identity recovered from the signature.
        recovered: String,
    },
}

impl RecoveryError {
    /// Create a `MalformedSignature` error.
    #[must_use]
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedSignature {
            context: context.into(),
        }
    }

    /// Create an `InvalidDocument` error.
    #[must_use]
    pub fn invalid_document(context: impl Into<String>) -> Self {
        Self::InvalidDocument {
            context: context.into(),
        }
    }

    /// Create an `IdentityMismatch` error.
    #[must_use]
    pub fn identity_mismatch(expected: impl Into<String>, recovered: impl Into<String>) -> Self {
        Self::IdentityMismatch {
            expected: expected.into(),
            recovered: recovered.into(),
        }
    }
}

// ============================================================================
// BroadcastError
// ============================================================================

/// Errors raised by the broadcaster. Never retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The transport failed before the node answered.
    #[error("broadcast failed: {context}")]
    Failure {
        /// Transport diagnostic.
        context: String,
    },

    /// The node answered but rejected the transaction.
    #[error("transaction rejected by node (code {code}): {log}")]
    Rejected {
        /// Node result code.
        code: i64,
        /// Node log message.
        log: String,
    },
}

impl BroadcastError {
    /// Create a `Failure` error.
    #[must_use]
    pub fn failure(context: impl Into<String>) -> Self {
        Self::Failure {
            context: context.into(),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// An I/O error occurred.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`SigilError`] as the error type.
pub type Result<T> = std::result::Result<T, SigilError>;

/// A `Result` type alias for address codec operations.
pub type AddressResult<T> = std::result::Result<T, AddressError>;

/// A `Result` type alias for encoding operations.
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
