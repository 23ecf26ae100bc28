//! # Address Command
//!
//! ```text
//! sigil address to-hex osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2 --chain osmosis-1
//! sigil address to-bech32 0x751e76e8199196d454941c45d1b3a323f1433bd6 --chain osmosis-1
//! sigil address from-pubkey 0279be66...f81798 --chain evmos_9001-2
//! ```

use std::path::PathBuf;

use sigil_chain::{to_checksum_hex, to_raw_hex, to_textual, ChainRegistry, SignerIdentityExt};
use sigil_core::error::{AddressError, ConfigError, SigilError};
use sigil_core::types::SignerIdentity;

use crate::cli::args::AddressCommands;

use super::decode_hex_input;

/// Errors that can occur during address conversion.
#[derive(Debug, thiserror::Error)]
pub enum AddressCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// The chain is not in the registry.
    #[error("{0}")]
    UnknownChain(#[from] SigilError),

    /// The address or key is malformed.
    #[error("{0}")]
    Address(#[from] AddressError),

    /// The public key is not hex.
    #[error("Invalid public key: {0}")]
    InvalidInput(String),
}

/// The `sigil address` command handler.
#[derive(Debug, Clone)]
pub struct AddressCommand {
    /// The conversion to perform.
    pub command: AddressCommands,
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl AddressCommand {
    /// Create a new `AddressCommand`.
    #[must_use]
    pub const fn new(command: AddressCommands, config_path: Option<PathBuf>) -> Self {
        Self {
            command,
            config_path,
        }
    }

    /// Run the conversion and print the result.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown chain or malformed input.
    pub fn run(&self) -> Result<(), AddressCommandError> {
        let config = super::load_config(self.config_path.as_deref())?;
        let registry = ChainRegistry::with_config(&config);
        println!("{}", self.convert(&registry)?);
        Ok(())
    }

    /// The text `run` prints.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn convert(&self, registry: &ChainRegistry) -> Result<String, AddressCommandError> {
        match &self.command {
            AddressCommands::ToHex { address, chain } => {
                let chain = registry.resolve(chain)?;
                Ok(to_raw_hex(address, &chain.bech32_prefix)?)
            }
            AddressCommands::ToBech32 { hex, chain } => {
                let chain = registry.resolve(chain)?;
                Ok(to_textual(hex, &chain.bech32_prefix)?)
            }
            AddressCommands::FromPubkey { pubkey, chain } => {
                let chain = registry.resolve(chain)?;
                let public_key =
                    decode_hex_input(pubkey).map_err(AddressCommandError::InvalidInput)?;
                let identity = SignerIdentity::from_public_key(chain, &public_key)?;
                Ok(render_identity(&identity)?)
            }
        }
    }
}

impl AddressCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        super::exit_codes::EXIT_ERROR
    }
}

fn render_identity(identity: &SignerIdentity) -> Result<String, AddressError> {
    Ok(format!(
        "textual:  {}\nraw hex:  {}\nchecksum: {}",
        identity.textual_address,
        identity.raw_hex_address,
        to_checksum_hex(&identity.raw_hex_address)?
    ))
}
