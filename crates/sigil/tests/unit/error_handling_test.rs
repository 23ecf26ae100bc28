//! Error types: traits, display text and exit codes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::error::Error;

use sigil::cli::commands::exit_codes::{EXIT_ERROR, EXIT_REJECTED, EXIT_SUCCESS};
use sigil::cli::commands::{
    AddressCommandError, ConfigCommandError, EncodeCommandError, InitError, RecoverCommandError,
    SignCommandError, VerifyCommandError,
};
use sigil::logging::LogError;
use sigil::SignerError;
use sigil_core::error::{ConfigError, ErrorKind, SigilError, SignError};

#[test]
fn test_error_trait_implementation() {
    let err = LogError::FileCreation("test".to_string());
    assert!(err.source().is_none());

    let err = InitError::AlreadyInitialized("/tmp/x".to_string());
    assert!(err.source().is_none());

    let err = ConfigCommandError::LoadError(ConfigError::NoHomeDirectory);
    assert!(err.source().is_some());

    let err = EncodeCommandError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "missing",
    ));
    assert!(err.source().is_some());
}

#[test]
fn test_exit_codes_are_distinct() {
    assert_eq!(EXIT_SUCCESS, 0);
    assert_eq!(EXIT_REJECTED, 1);
    assert_eq!(EXIT_ERROR, 2);
}

#[test]
fn test_command_exit_codes() {
    assert_eq!(SignCommandError::Rejected("declined".to_string()).exit_code(), EXIT_REJECTED);
    assert_eq!(SignCommandError::Failed("boom".to_string()).exit_code(), EXIT_ERROR);
    assert_eq!(SignCommandError::KeyNotFound.exit_code(), EXIT_ERROR);
    assert_eq!(VerifyCommandError::Invalid.exit_code(), EXIT_REJECTED);
    assert_eq!(
        RecoverCommandError::Mismatch {
            expected: "0x01".to_string(),
            recovered: "0x02".to_string(),
        }
        .exit_code(),
        EXIT_REJECTED
    );
    assert_eq!(
        AddressCommandError::InvalidInput("zz".to_string()).exit_code(),
        EXIT_ERROR
    );
}

#[test]
fn test_signer_errors_classify() {
    let rejected: SigilError = SignError::from(SignerError::Rejected("no".to_string())).into();
    assert_eq!(rejected.kind(), ErrorKind::SignerRejected);
    assert!(rejected.kind().is_user_rejection());

    let failed: SigilError = SignError::from(SignerError::Failed("usb".to_string())).into();
    assert_eq!(failed.kind(), ErrorKind::SignerFailed);
    assert!(!failed.kind().is_user_rejection());
}

#[test]
fn test_error_display() {
    assert!(SignCommandError::KeyNotFound.to_string().contains("SIGIL_DEV_KEY"));
    assert_eq!(
        RecoverCommandError::Mismatch {
            expected: "0x01".to_string(),
            recovered: "0x02".to_string(),
        }
        .to_string(),
        "Signer mismatch: expected 0x01, recovered 0x02"
    );
    assert!(InitError::AlreadyInitialized("/tmp/x".to_string())
        .to_string()
        .contains("--force"));
}
