//! # Encode Command
//!
//! `sigil encode <INTENT> --chain <ID> --pubkey <HEX>` prints the bytes a
//! signer would be asked to sign, without contacting any node.
//!
//! The intent file is the JSON form of an unsigned intent:
//!
//! ```json
//! { "type": "ethereum_message", "payload": "0x68656c6c6f" }
//! ```
//!
//! ## Output Formats
//!
//! Hex prints the signer bytes. JSON adds the digest and signer:
//!
//! ```json
//! {
//!   "kind": "personal_message",
//!   "sign_bytes": "0x...",
//!   "digest": "0x...",
//!   "signer": "0x..."
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sigil_chain::{ChainRegistry, EncodedPayload, PayloadEncoder, SignerIdentityExt};
use sigil_core::error::{AddressError, ConfigError, EncodeError, SigilError};
use sigil_core::types::{SignerIdentity, UnsignedIntent};

use crate::cli::args::OutputFormat;

use super::{decode_hex_input, format_hex_output};

/// Errors that can occur while encoding an intent.
#[derive(Debug, thiserror::Error)]
pub enum EncodeCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// The intent file could not be read.
    #[error("Failed to read intent: {0}")]
    Io(#[from] io::Error),

    /// The intent file is not a valid intent.
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    /// The public key is malformed.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The chain is not in the registry.
    #[error("{0}")]
    UnknownChain(#[from] SigilError),

    /// The intent failed validation.
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// The output could not be rendered.
    #[error("Failed to serialize output: {0}")]
    Serialize(String),
}

impl EncodeCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        super::exit_codes::EXIT_ERROR
    }
}

impl From<AddressError> for EncodeCommandError {
    fn from(err: AddressError) -> Self {
        Self::InvalidPublicKey(err.to_string())
    }
}

/// JSON output of `sigil encode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeOutput {
    /// Payload kind, e.g. `cosmos_direct`.
    pub kind: String,
    /// Bytes handed to the signer.
    pub sign_bytes: String,
    /// Digest the signature commits to.
    pub digest: String,
    /// Textual address of the signer.
    pub signer: String,
}

/// The `sigil encode` command handler.
#[derive(Debug, Clone)]
pub struct EncodeCommand {
    /// JSON intent file.
    pub intent: PathBuf,
    /// Chain identifier.
    pub chain: String,
    /// Signer public key hex.
    pub pubkey: String,
    /// Output format.
    pub format: OutputFormat,
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl EncodeCommand {
    /// Create a new `EncodeCommand`.
    #[must_use]
    pub fn new(
        intent: PathBuf,
        chain: impl Into<String>,
        pubkey: impl Into<String>,
        format: OutputFormat,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            intent,
            chain: chain.into(),
            pubkey: pubkey.into(),
            format,
            config_path,
        }
    }

    /// Encode the intent and print it.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent cannot be read or fails validation.
    pub fn run(&self) -> Result<(), EncodeCommandError> {
        let config = super::load_config(self.config_path.as_deref())?;
        let registry = ChainRegistry::with_config(&config);
        let output = self.encode(&registry)?;
        match self.format {
            OutputFormat::Hex => println!("{}", output.sign_bytes),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .map_err(|e| EncodeCommandError::Serialize(e.to_string()))?
            ),
        }
        Ok(())
    }

    /// Encodes against `registry` and returns the rendered output.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn encode(&self, registry: &ChainRegistry) -> Result<EncodeOutput, EncodeCommandError> {
        let chain = registry.resolve(&self.chain)?;
        let public_key =
            decode_hex_input(&self.pubkey).map_err(EncodeCommandError::InvalidPublicKey)?;
        let identity = SignerIdentity::from_public_key(chain, &public_key)?;
        let intent = read_intent(&self.intent)?;

        let encoded = PayloadEncoder::new().encode(chain, &identity, &intent)?;
        render(&encoded, &identity)
    }
}

/// Reads a JSON intent file.
///
/// # Errors
///
/// Returns [`EncodeCommandError::Io`] or [`EncodeCommandError::InvalidIntent`].
pub fn read_intent(path: &Path) -> Result<UnsignedIntent, EncodeCommandError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| EncodeCommandError::InvalidIntent(e.to_string()))
}

fn render(
    encoded: &EncodedPayload,
    identity: &SignerIdentity,
) -> Result<EncodeOutput, EncodeCommandError> {
    Ok(EncodeOutput {
        kind: encoded.kind().to_string(),
        sign_bytes: format_hex_output(&encoded.signer_bytes()),
        digest: format_hex_output(&encoded.digest()?),
        signer: identity.textual_address.clone(),
    })
}
