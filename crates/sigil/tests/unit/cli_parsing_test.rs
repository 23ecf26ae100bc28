//! Argument parsing and address codec properties.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::path::PathBuf;

use clap::Parser;
use proptest::prelude::*;
use sigil::cli::{Cli, Commands, OutputFormat};
use sigil::cli::commands::decode_hex_input;
use sigil::LogFormat;
use sigil_chain::{to_raw_hex, to_textual};

use crate::common::{account_bytes, hrp};

#[test]
fn test_sign_defaults() {
    let cli = Cli::try_parse_from(["sigil", "sign", "tx.json", "--chain", "osmosis-1"]).unwrap();
    match cli.command {
        Commands::Sign {
            intent,
            chain,
            no_broadcast,
            format,
        } => {
            assert_eq!(intent, PathBuf::from("tx.json"));
            assert_eq!(chain, "osmosis-1");
            assert!(!no_broadcast);
            assert_eq!(format, OutputFormat::Json);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(cli.log_format, LogFormat::Pretty));
}

#[test]
fn test_sign_requires_chain() {
    assert!(Cli::try_parse_from(["sigil", "sign", "tx.json"]).is_err());
}

#[test]
fn test_verify_with_address() {
    let cli = Cli::try_parse_from([
        "sigil",
        "--config",
        "/tmp/sigil.toml",
        "verify",
        "--chain",
        "osmosis-1",
        "--message",
        "6c6f67696e",
        "--hex",
        "--signature",
        "00",
        "--pubkey",
        "02",
        "--address",
        "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2",
    ])
    .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/sigil.toml")));
    match cli.command {
        Commands::Verify { hex, address, .. } => {
            assert!(hex);
            assert!(address.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_no_arguments_is_an_error() {
    assert!(Cli::try_parse_from(["sigil"]).is_err());
}

proptest! {
    #[test]
    fn prop_address_codec_inverts(account in account_bytes(), prefix in hrp()) {
        let raw = format!("0x{}", hex::encode(account));
        let textual = to_textual(&raw, &prefix).unwrap();
        let expected_prefix = format!("{prefix}1");
        prop_assert!(textual.starts_with(&expected_prefix));
        prop_assert_eq!(to_raw_hex(&textual, &prefix).unwrap(), raw);
    }

    #[test]
    fn prop_uppercase_textual_is_accepted(account in account_bytes(), prefix in hrp()) {
        let raw = format!("0x{}", hex::encode(account));
        let textual = to_textual(&raw, &prefix).unwrap().to_uppercase();
        prop_assert_eq!(to_raw_hex(&textual, &prefix).unwrap(), raw);
    }

    #[test]
    fn prop_decode_hex_input_accepts_both_forms(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let plain = hex::encode(&bytes);
        prop_assert_eq!(decode_hex_input(&plain).unwrap(), bytes.clone());
        prop_assert_eq!(decode_hex_input(&format!("0x{plain}")).unwrap(), bytes);
    }
}
