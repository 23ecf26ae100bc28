//! # Sign Command
//!
//! `sigil sign <INTENT> --chain <ID>` runs an intent through the full
//! dispatcher: account and fee resolution, encoding, signing with an
//! in-memory development key, assembly and broadcast.
//!
//! The secret key is read from `SIGIL_DEV_KEY`. Ctrl+C cancels the request;
//! nothing is broadcast after cancellation.
//!
//! ## Output Formats
//!
//! ### Hex
//!
//! The signed transaction, or the signature for non-transaction intents.
//!
//! ### JSON (default)
//!
//! ```json
//! {
//!   "state": "done",
//!   "correlation_id": "...",
//!   "signature": "0x...",
//!   "signed_transaction": "0x...",
//!   "tx_hash": "0x..."
//! }
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Rejected by the signer or cancelled
//! - 2: Other error

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use sigil_chain::ChainRegistry;
use sigil_core::config::Config;
use sigil_core::error::{ConfigError, SigilError};
use sigil_core::types::VerificationOutcome;
use tokio_util::sync::CancellationToken;

use crate::cli::args::OutputFormat;
use crate::cli::commands::exit_codes::{EXIT_ERROR, EXIT_REJECTED};
use crate::dispatcher::{DispatchOutcome, DispatchState, Dispatcher, SigningRequest};
use crate::signer::LocalSigner;

use super::encode::{read_intent, EncodeCommandError};
use super::format_hex_output;

/// Environment variable holding the development secret key.
pub const DEV_KEY_ENV: &str = "SIGIL_DEV_KEY";

// ============================================================================
// SignCommandError
// ============================================================================

/// Errors that can occur while signing.
#[derive(Debug, thiserror::Error)]
pub enum SignCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// `SIGIL_DEV_KEY` is not set.
    #[error("No signing key. Set {DEV_KEY_ENV} to a hex secret key.")]
    KeyNotFound,

    /// The intent file could not be read.
    #[error("{0}")]
    Intent(#[from] EncodeCommandError),

    /// Setup failed before the request was dispatched.
    #[error("{0}")]
    Setup(#[from] SigilError),

    /// The signer declined or the request was cancelled.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The dispatch ended in `Failed`.
    #[error("Signing failed: {0}")]
    Failed(String),

    /// The output could not be rendered.
    #[error("Failed to serialize output: {0}")]
    Serialize(String),
}

impl SignCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected(_) => EXIT_REJECTED,
            _ => EXIT_ERROR,
        }
    }
}

// ============================================================================
// SignOutput
// ============================================================================

/// Rendered result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignOutput {
    /// Final dispatcher state.
    pub state: String,
    /// Correlation id, as logged.
    pub correlation_id: String,
    /// Signature returned by the signer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Assembled transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_transaction: Option<String>,
    /// Broadcast or locally computed transaction hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Identity check for identity-proving intents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationOutcome>,
    /// Why the dispatch did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DispatchOutcome> for SignOutput {
    fn from(outcome: &DispatchOutcome) -> Self {
        let tx_hash = outcome.tx_hash.clone().or_else(|| {
            outcome
                .envelope
                .as_ref()
                .filter(|_| outcome.is_done())
                .map(crate::broadcast::SignedEnvelope::local_hash)
        });
        Self {
            state: outcome.state().to_string(),
            correlation_id: outcome.correlation_id.clone(),
            signature: outcome
                .signed
                .as_ref()
                .map(|signed| format_hex_output(&signed.signature)),
            signed_transaction: outcome
                .envelope
                .as_ref()
                .map(|envelope| format_hex_output(envelope.bytes())),
            tx_hash,
            verification: outcome.verification.clone(),
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}

impl SignOutput {
    /// The single line printed in hex mode.
    #[must_use]
    pub fn hex_line(&self) -> Option<&str> {
        self.signed_transaction
            .as_deref()
            .or(self.signature.as_deref())
    }
}

// ============================================================================
// SignCommand
// ============================================================================

/// The `sigil sign` command handler.
#[derive(Debug, Clone)]
pub struct SignCommand {
    /// JSON intent file.
    pub intent: PathBuf,
    /// Chain identifier.
    pub chain: String,
    /// Skip broadcasting.
    pub no_broadcast: bool,
    /// Output format.
    pub format: OutputFormat,
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl SignCommand {
    /// Create a new `SignCommand`.
    #[must_use]
    pub fn new(
        intent: PathBuf,
        chain: impl Into<String>,
        no_broadcast: bool,
        format: OutputFormat,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            intent,
            chain: chain.into(),
            no_broadcast,
            format,
            config_path,
        }
    }

    /// Run the sign command.
    ///
    /// # Errors
    ///
    /// Returns [`SignCommandError::Rejected`] if the signer declined or the
    /// user pressed Ctrl+C, and other variants for setup or signing failures.
    pub async fn run(&self) -> Result<(), SignCommandError> {
        let config = super::load_config(self.config_path.as_deref())?;
        let secret = std::env::var(DEV_KEY_ENV).map_err(|_| SignCommandError::KeyNotFound)?;

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_interrupt(cancel.clone()));
        let result = self.execute(config, &secret, &cancel).await;
        watcher.abort();

        let output = result?;
        self.print(&output)?;
        outcome_status(&output)
    }

    /// Dispatches the intent with `secret` and returns the rendered outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only for setup failures; a rejected or failed
    /// dispatch is reported in the output.
    pub async fn execute(
        &self,
        mut config: Config,
        secret: &str,
        cancel: &CancellationToken,
    ) -> Result<SignOutput, SignCommandError> {
        if self.no_broadcast {
            config.broadcast.enabled = false;
        }
        let registry = ChainRegistry::with_config(&config);
        let signer = LocalSigner::from_hex(secret, registry.clone()).map_err(SigilError::from)?;
        let identity = signer
            .identity(registry.resolve(&self.chain)?)
            .map_err(SigilError::from)?;
        let intent = read_intent(&self.intent)?;

        let dispatcher = Dispatcher::from_config(&config, Arc::new(signer))?;
        let outcome = dispatcher
            .dispatch(SigningRequest::new(&self.chain, identity, intent), cancel)
            .await;
        Ok(SignOutput::from(&outcome))
    }

    fn print(&self, output: &SignOutput) -> Result<(), SignCommandError> {
        match self.format {
            OutputFormat::Hex => {
                if let Some(line) = output.hex_line() {
                    println!("{line}");
                }
            }
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(output)
                    .map_err(|e| SignCommandError::Serialize(e.to_string()))?
            ),
        }
        Ok(())
    }
}

fn outcome_status(output: &SignOutput) -> Result<(), SignCommandError> {
    let reason = || output.error.clone().unwrap_or_default();
    if output.state == DispatchState::Rejected.as_str() {
        Err(SignCommandError::Rejected(reason()))
    } else if output.state == DispatchState::Failed.as_str() {
        Err(SignCommandError::Failed(reason()))
    } else {
        Ok(())
    }
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, cancelling request");
        cancel.cancel();
    }
}
