//! # Verify Command
//!
//! ```text
//! sigil verify --chain osmosis-1 --message login --signature <HEX> --pubkey <HEX>
//! sigil verify --chain osmosis-1 --message login --signature <HEX> --pubkey <HEX> \
//!     --address osmo1...
//! ```
//!
//! Without `--address` the message is hashed with the chain's digest
//! (SHA-256 or Keccak-256). With it, the signature must cover the ADR-036
//! document binding the message to that address.
//!
//! Prints `valid` and exits 0, or prints `invalid` and exits 1.

use std::path::PathBuf;

use sigil_chain::{verify, verify_arbitrary, ChainRegistry};
use sigil_core::error::{ConfigError, SigilError};

use crate::cli::commands::exit_codes::{EXIT_ERROR, EXIT_REJECTED};

use super::decode_hex_input;

/// Errors that can occur during verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifyCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// The chain is not in the registry.
    #[error("{0}")]
    UnknownChain(#[from] SigilError),

    /// An argument is not valid hex.
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// Which argument.
        field: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The signature does not verify.
    #[error("Signature is invalid")]
    Invalid,
}

impl VerifyCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Invalid => EXIT_REJECTED,
            _ => EXIT_ERROR,
        }
    }
}

/// The `sigil verify` command handler.
#[derive(Debug, Clone)]
pub struct VerifyCommand {
    /// Chain identifier.
    pub chain: String,
    /// Signed message.
    pub message: String,
    /// Treat `message` as hex.
    pub hex: bool,
    /// Signature hex.
    pub signature: String,
    /// Public key hex.
    pub pubkey: String,
    /// ADR-036 signer address.
    pub address: Option<String>,
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl VerifyCommand {
    /// Prints `valid` or `invalid`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyCommandError::Invalid`] for a signature that does not
    /// verify, and other variants for malformed input.
    pub fn run(&self) -> Result<(), VerifyCommandError> {
        let config = super::load_config(self.config_path.as_deref())?;
        let registry = ChainRegistry::with_config(&config);
        if self.check(&registry)? {
            println!("valid");
            Ok(())
        } else {
            println!("invalid");
            Err(VerifyCommandError::Invalid)
        }
    }

    /// Returns whether the signature verifies.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown chain or malformed hex.
    pub fn check(&self, registry: &ChainRegistry) -> Result<bool, VerifyCommandError> {
        let chain = registry.resolve(&self.chain)?;
        let message = if self.hex {
            decode(&self.message, "message")?
        } else {
            self.message.as_bytes().to_vec()
        };
        let signature = decode(&self.signature, "signature")?;
        let public_key = decode(&self.pubkey, "public key")?;

        let valid = match &self.address {
            Some(address) => verify_arbitrary(chain, address, &message, &signature, &public_key),
            None => verify(chain.family, &message, &signature, &public_key),
        };
        tracing::debug!(chain_id = %chain.chain_id, adr36 = self.address.is_some(), valid, "verified signature");
        Ok(valid)
    }
}

fn decode(input: &str, field: &'static str) -> Result<Vec<u8>, VerifyCommandError> {
    decode_hex_input(input).map_err(|reason| VerifyCommandError::InvalidInput { field, reason })
}
