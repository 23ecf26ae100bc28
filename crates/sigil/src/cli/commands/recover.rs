//! # Recover Command
//!
//! ```text
//! sigil recover --message "hello" --signature <HEX>
//! sigil recover --typed-data permit.json --signature <HEX> --expected 0x...
//! ```
//!
//! Prints the lowercase `0x` address that produced the signature. With
//! `--expected`, exits 1 when the recovered address differs.

use std::io;
use std::path::PathBuf;

use sigil_chain::{check_identity, recover_identity, RecoverInput};
use sigil_core::error::RecoveryError;
use sigil_core::types::TypedData;

use crate::cli::commands::exit_codes::{EXIT_ERROR, EXIT_REJECTED};

use super::decode_hex_input;

/// Errors that can occur during recovery.
#[derive(Debug, thiserror::Error)]
pub enum RecoverCommandError {
    /// The typed-data file could not be read.
    #[error("Failed to read typed data: {0}")]
    Io(#[from] io::Error),

    /// The typed-data file is not an EIP-712 document.
    #[error("Invalid typed data: {0}")]
    InvalidDocument(String),

    /// The signature is not hex.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// No signer could be recovered.
    #[error("{0}")]
    Recovery(#[from] RecoveryError),

    /// The recovered address is not the expected one.
    #[error("Signer mismatch: expected {expected}, recovered {recovered}")]
    Mismatch {
        /// The `--expected` address.
        expected: String,
        /// The recovered address.
        recovered: String,
    },
}

impl RecoverCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Mismatch { .. } => EXIT_REJECTED,
            _ => EXIT_ERROR,
        }
    }
}

/// The `sigil recover` command handler.
#[derive(Debug, Clone)]
pub struct RecoverCommand {
    /// EIP-712 document file.
    pub typed_data: Option<PathBuf>,
    /// EIP-191 message.
    pub message: Option<String>,
    /// 65-byte signature hex.
    pub signature: String,
    /// Expected signer.
    pub expected: Option<String>,
}

impl RecoverCommand {
    /// Prints the recovered signer.
    ///
    /// # Errors
    ///
    /// Returns [`RecoverCommandError::Mismatch`] if `--expected` differs from
    /// the recovered signer, and other variants for malformed input.
    pub fn run(&self) -> Result<(), RecoverCommandError> {
        let recovered = self.recover()?;
        println!("{recovered}");
        Ok(())
    }

    /// The recovered signer, checked against `expected` if set.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn recover(&self) -> Result<String, RecoverCommandError> {
        let signature =
            decode_hex_input(&self.signature).map_err(RecoverCommandError::InvalidSignature)?;
        let document = self.load_document()?;
        let input = match (&document, &self.message) {
            (Some(document), _) => RecoverInput::TypedData(document),
            (None, Some(message)) => RecoverInput::PersonalMessage(message.as_bytes()),
            (None, None) => {
                return Err(RecoverCommandError::InvalidDocument(
                    "either --typed-data or --message is required".to_string(),
                ))
            }
        };

        match &self.expected {
            None => Ok(recover_identity(input, &signature)?),
            Some(expected) => {
                let outcome = check_identity(input, &signature, expected)?;
                if outcome.matched {
                    Ok(outcome.recovered_identity)
                } else {
                    Err(RecoverCommandError::Mismatch {
                        expected: expected.clone(),
                        recovered: outcome.recovered_identity,
                    })
                }
            }
        }
    }

    fn load_document(&self) -> Result<Option<TypedData>, RecoverCommandError> {
        let Some(path) = &self.typed_data else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RecoverCommandError::InvalidDocument(e.to_string()))
    }
}
