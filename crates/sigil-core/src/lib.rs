//! # sigil-core
//!
//! Core types, error definitions and configuration for the Sigil signing core.
//!
//! ## Modules
//!
//! - [`error`] - Error types, [`ErrorKind`] classification and result aliases
//! - [`types`] - The request data model ([`UnsignedIntent`], [`ChainDescriptor`], ...)
//! - [`config`] - Resolver, broadcast and chain configuration
//! - [`config_loader`] - Reading and writing `~/.sigil/config.toml`
//!
//! ## Error Handling
//!
//! ```rust
//! use sigil_core::error::{EncodeError, ErrorKind, SigilError};
//!
//! let err: SigilError = EncodeError::AccessListMissing.into();
//! assert_eq!(err.kind(), ErrorKind::InvalidPayload);
//! assert!(!err.kind().is_user_rejection());
//! ```
//!
//! [`ErrorKind`]: error::ErrorKind
//! [`UnsignedIntent`]: types::UnsignedIntent
//! [`ChainDescriptor`]: types::ChainDescriptor

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod types;

pub use error::{
    AddressError, BroadcastError, ConfigError, EncodeError, ErrorKind, RecoveryError,
    ResolveError, Result, SigilError, SignError,
};

pub use config::{BroadcastConfig, Config, ConfigBuilder, ResolverConfig};

pub use config_loader::{expand_path, load_config, load_from_file, ConfigLoader};

pub use types::{
    AccessListItem, AccountState, AminoMsg, AnyMessage, BroadcastMode, ChainDescriptor,
    ChainFamily, Coin, CosmosFee, Currency, DirectCosmosTx, Eip712CosmosTx, EthSignType,
    EvmTransaction, EvmTxKind, FeeData, SignedPayload, SignedResult, SignerIdentity, TypedData,
    TypedDataDomain, TypedDataField, UnsignedIntent, VerificationOutcome,
};

pub use alloy_primitives::{Address, Bytes, B256, U256};
