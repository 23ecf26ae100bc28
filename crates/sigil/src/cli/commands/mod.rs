//! # CLI Command Handlers
//!
//! One struct per command with a `new` constructor and a `run` method. Each
//! command has its own error enum; `exit_code()` maps it onto
//! [`exit_codes`].
//!
//! - [`init`] - Write the default configuration
//! - [`config`] - Show the configuration
//! - [`chains`] - List known chains
//! - [`address`] - Address conversions
//! - [`encode`] - Offline intent encoding
//! - [`sign`] - Full signing flow with a development key
//! - [`verify`] - Signature verification
//! - [`recover`] - Signer recovery for EVM identity proofs

use std::path::Path;

use sigil_core::config::Config;
use sigil_core::config_loader::{load_from_file, ConfigLoader};
use sigil_core::error::ConfigError;

pub mod address;
pub mod chains;
pub mod config;
pub mod encode;
pub mod exit_codes;
pub mod init;
pub mod recover;
pub mod sign;
pub mod verify;

pub use address::{AddressCommand, AddressCommandError};
pub use chains::{ChainsCommand, ChainsCommandError};
pub use config::{ConfigCommand, ConfigCommandError};
pub use encode::{EncodeCommand, EncodeCommandError, EncodeOutput};
pub use init::{InitCommand, InitError};
pub use recover::{RecoverCommand, RecoverCommandError};
pub use sign::{SignCommand, SignCommandError, SignOutput};
pub use verify::{VerifyCommand, VerifyCommandError};

/// Loads `path` if given, otherwise `~/.sigil/config.toml` or the built-in
/// defaults when that file does not exist.
///
/// # Errors
///
/// Returns the loader's [`ConfigError`].
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_from_file(path),
        None => ConfigLoader::new()?.load(),
    }
}

/// Decodes hex with or without a `0x` prefix.
///
/// # Errors
///
/// Returns a description of the problem for empty or malformed input.
pub fn decode_hex_input(input: &str) -> Result<Vec<u8>, String> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() {
        return Err("empty hex input".to_string());
    }
    hex::decode(digits).map_err(|e| format!("invalid hex {input:?}: {e}"))
}

/// Formats bytes as `0x`-prefixed hex.
#[must_use]
pub fn format_hex_output(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
