//! Command handlers against a configuration written by `sigil init`.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::path::{Path, PathBuf};

use sigil::cli::args::{AddressCommands, OutputFormat};
use sigil::cli::commands::{
    chains, load_config, AddressCommand, EncodeCommand, InitCommand, SignCommand,
};
use sigil_chain::ChainRegistry;
use tokio_util::sync::CancellationToken;

use crate::common::{temp_data_dir, KEY_ONE};

const KEY_ONE_PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

const JUNO: &str = r#"
[resolver]
max_attempts = 2

[[chains]]
chain_id = "juno-1"
family = "cosmos-sdk"
bech32_prefix = "juno"

[chains.fee_currency]
denom = "JUNO"
minimal_denom = "ujuno"
decimals = 6
"#;

fn init(dir: &Path) -> PathBuf {
    InitCommand::new(false).run_with_base_dir(dir).unwrap()
}

fn write_intent(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("intent.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_init_then_list_chains() {
    let dir = temp_data_dir();
    let path = init(dir.path());

    let registry = ChainRegistry::with_config(&load_config(Some(&path)).unwrap());
    let lines = chains::render(&registry);
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_configured_chain_is_usable() {
    let dir = temp_data_dir();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, JUNO).unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.resolver.max_attempts, 2);
    let registry = ChainRegistry::with_config(&config);
    assert!(chains::render(&registry)
        .iter()
        .any(|line| line.starts_with("juno-1")));

    let cmd = AddressCommand::new(
        AddressCommands::ToBech32 {
            hex: "0x751e76e8199196d454941c45d1b3a323f1433bd6".to_string(),
            chain: "juno-1".to_string(),
        },
        Some(path),
    );
    let textual = cmd.convert(&registry).unwrap();
    assert!(textual.starts_with("juno1"));
}

#[test]
fn test_encode_from_intent_file() {
    let dir = temp_data_dir();
    let config_path = init(dir.path());
    let intent = write_intent(
        dir.path(),
        r#"{
            "type": "direct_cosmos_tx",
            "messages": [{
                "type_url": "/cosmos.bank.v1beta1.MsgSend",
                "value": "0a0161"
            }],
            "memo": "ABC",
            "fee": {"amount": [{"denom": "uosmo", "amount": "2500"}], "gas_limit": 200000},
            "account_number": 42,
            "sequence": 5
        }"#,
    );

    let registry = ChainRegistry::with_config(&load_config(Some(&config_path)).unwrap());
    let cmd = EncodeCommand::new(
        intent,
        "osmosis-1",
        KEY_ONE_PUBKEY,
        OutputFormat::Json,
        Some(config_path),
    );
    let first = cmd.encode(&registry).unwrap();
    let second = cmd.encode(&registry).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.kind, "cosmos_direct");
    assert_eq!(first.signer, "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2");
}

#[tokio::test]
async fn test_sign_identity_proof_without_network() {
    let dir = temp_data_dir();
    let config_path = init(dir.path());
    let intent = write_intent(
        dir.path(),
        r#"{"type": "arbitrary_bytes", "payload": "0x6c6f67696e"}"#,
    );

    let cmd = SignCommand::new(intent, "osmosis-1", true, OutputFormat::Json, None);
    let output = cmd
        .execute(
            load_config(Some(&config_path)).unwrap(),
            KEY_ONE,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.state, "done");
    assert!(output.tx_hash.is_none());
    let verification = output.verification.unwrap();
    assert!(verification.matched);
    assert_eq!(
        verification.recovered_identity,
        "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2"
    );
}
