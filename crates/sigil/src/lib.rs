//! # Sigil
//!
//! Chain-agnostic transaction signing and verification.
//!
//! The [`Dispatcher`] takes a [`SigningRequest`] for a Cosmos SDK or
//! EVM-compatible chain through account and fee resolution, canonical
//! encoding, an [`ExternalSigner`], assembly, verification and broadcast.
//! Key material never enters this crate: signatures come from the signer
//! seam, and [`LocalSigner`] exists for development and tests only.
//!
//! ## Modules
//!
//! - [`dispatcher`] - The signing state machine
//! - [`resolver`] - Account number, sequence, nonce, gas and fee resolution
//! - [`provider`] - Chain state over Cosmos REST and Ethereum JSON-RPC
//! - [`broadcast`] - Signed envelope submission
//! - [`signer`] - The external signer seam
//! - [`rpc`] - Shared HTTP client
//! - [`logging`] - Tracing setup and redaction helpers
//! - [`cli`] - Command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sigil::{Dispatcher, LocalSigner, SigningRequest};
//! use sigil_chain::ChainRegistry;
//! use sigil_core::config::Config;
//! use sigil_core::types::UnsignedIntent;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let registry = ChainRegistry::with_config(&config);
//! let signer = LocalSigner::generate(registry.clone());
//! let identity = signer.identity(registry.resolve("osmosis-1")?)?;
//!
//! let dispatcher = Dispatcher::from_config(&config, Arc::new(signer))?;
//! let request = SigningRequest::new(
//!     "osmosis-1",
//!     identity,
//!     UnsignedIntent::ArbitraryBytes { payload: b"login".to_vec() },
//! );
//! let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;
//! assert!(outcome.is_done());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod broadcast;
pub mod cli;
pub mod dispatcher;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod rpc;
pub mod signer;

pub use broadcast::{Broadcaster, HttpBroadcaster, SignedEnvelope};
pub use dispatcher::{DispatchOutcome, DispatchState, Dispatcher, SigningRequest};
pub use logging::{
    init_logging, log_audit_event, new_correlation_id, redact_bytes, redact_sensitive,
    verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard, LogLevel,
};
pub use provider::{ChainStateProvider, HttpChainStateProvider};
pub use resolver::{FeeNonceResolver, LaneGuard, RetryPolicy, SequenceLanes};
pub use signer::{
    DirectSignDoc, DirectSignResponse, ExternalSigner, LocalSigner, SignerError,
};
