//! End-to-end signing flows through the dispatcher with scripted seams.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use sigil::{DispatchState, SignedEnvelope, SigningRequest};
use sigil_chain::cosmos::{self, proto};
use sigil_chain::{recover_identity, ChainRegistry, PayloadEncoder, RecoverInput};
use sigil_core::error::{BroadcastError, EncodeError, ErrorKind};
use sigil_core::types::{BroadcastMode, EvmTxKind, TypedData, UnsignedIntent};
use tokio_util::sync::CancellationToken;

use crate::common::{
    arbitrary_intent, chain, dispatcher, evmos_transfer, fast_retry, identity, osmo_send,
    RecordingBroadcaster, ScriptedProvider, ScriptedSigner, SignerMode,
};

const RECIPIENT: &str = "osmo1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5helwsw";

fn seams(
    mode: SignerMode,
    provider: ScriptedProvider,
) -> (Arc<ScriptedSigner>, Arc<ScriptedProvider>, Arc<RecordingBroadcaster>) {
    (
        Arc::new(ScriptedSigner::new(mode)),
        Arc::new(provider),
        Arc::new(RecordingBroadcaster::default()),
    )
}

// ============================================================================
// Cosmos direct signing
// ============================================================================

#[test]
fn test_cosmos_encoding_is_byte_stable() {
    let chain = chain("osmosis-1");
    let identity = identity("osmosis-1");
    let mut tx = osmo_send(RECIPIENT, "10000", "ABC");
    tx.account_number = 42;
    tx.sequence = 5;
    let intent = UnsignedIntent::DirectCosmosTx(tx);

    let encoder = PayloadEncoder::new();
    let first = encoder.encode(&chain, &identity, &intent).unwrap();
    for _ in 0..5 {
        assert_eq!(encoder.encode(&chain, &identity, &intent).unwrap(), first);
    }
    assert_eq!(first.kind(), "cosmos_direct");
}

#[tokio::test]
async fn test_cosmos_send_resolves_signs_and_broadcasts() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "ABC")),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert!(outcome.is_done(), "{:?}", outcome.error);
    assert_eq!(
        outcome.trail,
        vec![
            DispatchState::Idle,
            DispatchState::ResolvingState,
            DispatchState::Encoding,
            DispatchState::AwaitingExternalSignature,
            DispatchState::Assembling,
            DispatchState::Done,
        ]
    );

    let sent = broadcaster.sent();
    assert_eq!(sent.len(), 1);
    let (chain_id, envelope, mode) = &sent[0];
    assert_eq!(chain_id, "osmosis-1");
    assert_eq!(*mode, BroadcastMode::Block);
    assert_eq!(outcome.tx_hash.as_deref(), Some(envelope.local_hash().as_str()));

    // Resolved account fields made it into the signed auth info.
    let SignedEnvelope::CosmosTxRaw(bytes) = envelope else {
        panic!("expected a cosmos envelope");
    };
    let tx_raw = cosmos::decode_tx_raw(bytes).unwrap();
    let auth_info = cosmos::decode_auth_info(&tx_raw.auth_info_bytes).unwrap();
    assert_eq!(auth_info.signer_infos[0].sequence, 5);
    assert_eq!(tx_raw.signatures[0].len(), 64);
}

#[tokio::test]
async fn test_echoed_body_bytes_are_assembled() {
    let (signer, provider, broadcaster) = seams(
        SignerMode::RewriteMemo("changed by wallet".to_string()),
        ScriptedProvider::ready(),
    );
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "ABC")),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;
    assert!(outcome.is_done(), "{:?}", outcome.error);

    let envelope = outcome.envelope.as_ref().unwrap();
    let tx_raw = cosmos::decode_tx_raw(envelope.bytes()).unwrap();
    let body = <proto::TxBody as prost::Message>::decode(tx_raw.body_bytes.as_slice()).unwrap();
    assert_eq!(body.memo, "changed by wallet");

    let echoed = outcome.signed.as_ref().unwrap().signed_payload.as_ref().unwrap();
    assert_eq!(echoed.body_bytes, tx_raw.body_bytes);
}

// ============================================================================
// EVM
// ============================================================================

#[test]
fn test_eip2930_access_list_presence() {
    let chain = chain("evmos_9001-2");
    let identity = identity("evmos_9001-2");
    let encoder = PayloadEncoder::new();

    let mut tx = evmos_transfer(EvmTxKind::Eip2930);
    tx.gas_price = Some(1_000_000_000);
    assert_eq!(tx.access_list, Some(Vec::new()));
    assert!(encoder
        .encode(&chain, &identity, &UnsignedIntent::EvmTransaction(tx.clone()))
        .is_ok());

    tx.access_list = None;
    let err = encoder
        .encode(&chain, &identity, &UnsignedIntent::EvmTransaction(tx))
        .unwrap_err();
    assert!(matches!(err, EncodeError::AccessListMissing));
}

#[tokio::test]
async fn test_evm_1559_transfer_fills_nonce_and_fees() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider.clone(), broadcaster.clone());

    let request = SigningRequest::new(
        "evmos_9001-2",
        identity("evmos_9001-2"),
        UnsignedIntent::EvmTransaction(evmos_transfer(EvmTxKind::Eip1559)),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert!(outcome.is_done(), "{:?}", outcome.error);
    let SignedEnvelope::EvmRaw(raw) = outcome.envelope.as_ref().unwrap() else {
        panic!("expected an EVM envelope");
    };
    assert_eq!(raw[0], 0x02);
    assert!(outcome.tx_hash.as_ref().unwrap().starts_with("0x"));
    assert_eq!(broadcaster.sent()[0].2, BroadcastMode::Sync);
    assert!(provider.nonce_calls.load(std::sync::atomic::Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_typed_data_signer_is_recovered() {
    let document: TypedData = serde_json::from_value(serde_json::json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"}
            ],
            "Login": [
                {"name": "account", "type": "address"},
                {"name": "nonce", "type": "uint256"},
                {"name": "statement", "type": "string"}
            ]
        },
        "primaryType": "Login",
        "domain": {"name": "Sigil", "version": "1", "chainId": 9001},
        "message": {
            "account": "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            "nonce": 11,
            "statement": "sign in"
        }
    }))
    .unwrap();

    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());
    let identity = identity("evmos_9001-2");

    let request = SigningRequest::new(
        "evmos_9001-2",
        identity.clone(),
        UnsignedIntent::TypedData(document.clone()),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;
    assert!(outcome.is_done(), "{:?}", outcome.error);
    assert!(outcome.envelope.is_none());
    assert!(broadcaster.sent().is_empty());

    let signature = &outcome.signed.as_ref().unwrap().signature;
    let recovered = recover_identity(RecoverInput::TypedData(&document), signature).unwrap();
    assert!(recovered.eq_ignore_ascii_case(&identity.raw_hex_address));
    assert!(recovered.eq_ignore_ascii_case("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
    assert!(outcome.verification.unwrap().matched);
}

#[tokio::test]
async fn test_eip712_cosmos_tx_is_signed_and_recovered() {
    let tx = serde_json::from_value(serde_json::json!({
        "domain": {"name": "Cosmos Web3", "version": "1.0.0", "chainId": 9001},
        "types": {
            "Tx": [
                {"name": "account_number", "type": "string"},
                {"name": "chain_id", "type": "string"},
                {"name": "fee", "type": "Fee"},
                {"name": "memo", "type": "string"},
                {"name": "msgs", "type": "Msg[]"},
                {"name": "sequence", "type": "string"}
            ],
            "Fee": [
                {"name": "amount", "type": "Coin[]"},
                {"name": "gas", "type": "string"}
            ],
            "Coin": [
                {"name": "amount", "type": "string"},
                {"name": "denom", "type": "string"}
            ],
            "Msg": [
                {"name": "type", "type": "string"},
                {"name": "value", "type": "Bid"}
            ],
            "Bid": [
                {"name": "amount", "type": "uint256"},
                {"name": "bidder", "type": "string"}
            ]
        },
        "primaryType": "Tx",
        "msgs": [{
            "type": "auction/Bid",
            "value": {"amount": 100, "bidder": "evmos10e0525sfrf53yh2aljmm3sn9jq5njk7lxpag6e"}
        }],
        "memo": "bid",
        "fee": {"amount": [{"denom": "aevmos", "amount": "1000"}], "gas_limit": 100000}
    }))
    .unwrap();

    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider.clone(), broadcaster.clone());
    let identity = identity("evmos_9001-2");

    let request = SigningRequest::new(
        "evmos_9001-2",
        identity.clone(),
        UnsignedIntent::Eip712CosmosTx(tx),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert!(outcome.is_done(), "{:?}", outcome.error);
    assert_eq!(provider.account_lookups(), 1);
    assert!(outcome.envelope.is_none());
    assert!(broadcaster.sent().is_empty());

    let verification = outcome.verification.as_ref().unwrap();
    assert!(verification.matched);
    assert!(verification
        .recovered_identity
        .eq_ignore_ascii_case("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"));
    assert!(verification.recovered_identity.eq_ignore_ascii_case(&identity.raw_hex_address));
}

// ============================================================================
// Account readiness
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_account_not_ready_hits_ceiling() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::never_ready());
    let dispatcher = dispatcher(signer.clone(), provider.clone(), broadcaster.clone())
        .with_retry_policy(fast_retry(10));

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "1", "")),
    );
    let started = tokio::time::Instant::now();
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert_eq!(outcome.state(), DispatchState::Failed);
    assert!(!outcome.visited(DispatchState::Encoding));
    assert_eq!(provider.account_lookups(), 10);
    assert!(started.elapsed() >= std::time::Duration::from_millis(900));
    assert_eq!(signer.request_count(), 0);
    assert!(broadcaster.sent().is_empty());

    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountNotReady);
    assert!(err.to_string().contains("10"));
}

#[tokio::test(start_paused = true)]
async fn test_account_ready_after_retries() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::not_ready_for(3));
    let dispatcher = dispatcher(signer, provider.clone(), broadcaster).with_retry_policy(fast_retry(10));

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "1", "")),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert!(outcome.is_done(), "{:?}", outcome.error);
    assert_eq!(provider.account_lookups(), 4);
}

// ============================================================================
// Rejection, cancellation, broadcast failure
// ============================================================================

#[tokio::test]
async fn test_signer_rejection_is_not_broadcast() {
    let (signer, provider, broadcaster) = seams(SignerMode::Reject, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer.clone(), provider, broadcaster.clone());

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "")),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert_eq!(outcome.state(), DispatchState::Rejected);
    assert!(!outcome.visited(DispatchState::Assembling));
    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::SignerRejected);
    assert_eq!(signer.request_count(), 1);
    assert!(outcome.signed.is_none());
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_while_awaiting_signature() {
    let (signer, provider, broadcaster) = seams(SignerMode::Hang, ScriptedProvider::ready());
    let dispatcher = Arc::new(dispatcher(signer.clone(), provider, broadcaster.clone()));
    let cancel = CancellationToken::new();

    let task = {
        let dispatcher = dispatcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let request = SigningRequest::new(
                "osmosis-1",
                identity("osmosis-1"),
                UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "")),
            );
            dispatcher.dispatch(request, &cancel).await
        })
    };

    signer.entered.notified().await;
    cancel.cancel();
    let outcome = task.await.unwrap();

    assert_eq!(outcome.state(), DispatchState::Rejected);
    assert!(outcome.visited(DispatchState::AwaitingExternalSignature));
    assert!(!outcome.visited(DispatchState::Assembling));
    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::Cancelled);
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_as_signer_answers_is_not_assembled() {
    let cancel = CancellationToken::new();
    let (signer, provider, broadcaster) =
        seams(SignerMode::CancelThenSign(cancel.clone()), ScriptedProvider::ready());
    let dispatcher = dispatcher(signer.clone(), provider, broadcaster.clone());

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "")),
    );
    let outcome = dispatcher.dispatch(request, &cancel).await;

    assert_eq!(signer.request_count(), 1);
    assert_eq!(outcome.state(), DispatchState::Rejected);
    assert!(!outcome.visited(DispatchState::Assembling));
    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::Cancelled);
    assert!(outcome.envelope.is_none());
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_as_evm_signer_answers_is_not_broadcast() {
    let cancel = CancellationToken::new();
    let (signer, provider, broadcaster) =
        seams(SignerMode::CancelThenSign(cancel.clone()), ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    let request = SigningRequest::new(
        "evmos_9001-2",
        identity("evmos_9001-2"),
        UnsignedIntent::EvmTransaction(evmos_transfer(EvmTxKind::Legacy)),
    );
    let outcome = dispatcher.dispatch(request, &cancel).await;

    assert_eq!(outcome.state(), DispatchState::Rejected);
    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::Cancelled);
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_during_assembly_is_rejected() {
    let cancel = CancellationToken::new();
    let (signer, provider, broadcaster) =
        seams(SignerMode::CancelOnVerify(cancel.clone()), ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    let request = SigningRequest::new("osmosis-1", identity("osmosis-1"), arbitrary_intent(b"nonce 8"));
    let outcome = dispatcher.dispatch(request, &cancel).await;

    assert!(outcome.visited(DispatchState::Assembling));
    assert_eq!(outcome.state(), DispatchState::Rejected);
    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::Cancelled);
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_broadcast_failure_keeps_signed_artifact() {
    let signer = Arc::new(ScriptedSigner::new(SignerMode::Sign));
    let provider = Arc::new(ScriptedProvider::ready());
    let broadcaster = Arc::new(RecordingBroadcaster::failing(BroadcastError::Rejected {
        code: 13,
        log: "insufficient fee".to_string(),
    }));
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    let request = SigningRequest::new(
        "osmosis-1",
        identity("osmosis-1"),
        UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "10000", "")),
    );
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert_eq!(outcome.state(), DispatchState::Failed);
    assert_eq!(broadcaster.sent().len(), 1);
    assert!(outcome.envelope.is_some());
    assert!(outcome.signed.is_some());
    assert!(outcome.tx_hash.is_none());
    let err = outcome.error.as_ref().unwrap();
    assert_eq!(err.kind(), ErrorKind::BroadcastFailure);
    assert!(err.to_string().contains("insufficient fee"));
}

#[tokio::test]
async fn test_identity_proof_on_cosmos_chain() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider.clone(), broadcaster.clone());
    let identity = identity("osmosis-1");

    let request = SigningRequest::new("osmosis-1", identity.clone(), arbitrary_intent(b"nonce 7"));
    let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

    assert!(outcome.is_done(), "{:?}", outcome.error);
    let verification = outcome.verification.unwrap();
    assert!(verification.matched);
    assert_eq!(verification.recovered_identity, identity.textual_address);
    assert_eq!(provider.account_lookups(), 0);
    assert!(broadcaster.sent().is_empty());
}

#[tokio::test]
async fn test_same_signer_requests_get_distinct_outcomes() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = Arc::new(dispatcher(signer, provider, broadcaster.clone()));

    let mut handles = Vec::new();
    for memo in ["one", "two", "three"] {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            let request = SigningRequest::new(
                "osmosis-1",
                identity("osmosis-1"),
                UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "1", memo)),
            );
            dispatcher.dispatch(request, &CancellationToken::new()).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.is_done(), "{:?}", outcome.error);
        ids.push(outcome.correlation_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(ChainRegistry::new().len(), 3);

    // The node reports sequence 5 every time; each request still signs its own.
    let mut sequences = broadcast_sequences(&broadcaster);
    sequences.sort_unstable();
    assert_eq!(sequences, vec![5, 6, 7]);
}

#[tokio::test]
async fn test_failed_broadcast_does_not_consume_sequence() {
    let signer = Arc::new(ScriptedSigner::new(SignerMode::Sign));
    let provider = Arc::new(ScriptedProvider::ready());
    let failing = Arc::new(RecordingBroadcaster::failing(BroadcastError::Failure {
        context: "connection reset".to_string(),
    }));
    let send = || {
        SigningRequest::new(
            "osmosis-1",
            identity("osmosis-1"),
            UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "1", "")),
        )
    };

    let dispatcher = dispatcher(signer, provider, failing.clone());
    let first = dispatcher.dispatch(send(), &CancellationToken::new()).await;
    assert_eq!(first.state(), DispatchState::Failed);
    let second = dispatcher.dispatch(send(), &CancellationToken::new()).await;
    assert_eq!(second.state(), DispatchState::Failed);

    assert_eq!(broadcast_sequences(&failing), vec![5, 5]);
}

#[tokio::test]
async fn test_sequential_requests_advance_sequence() {
    let (signer, provider, broadcaster) = seams(SignerMode::Sign, ScriptedProvider::ready());
    let dispatcher = dispatcher(signer, provider, broadcaster.clone());

    for memo in ["first", "second"] {
        let request = SigningRequest::new(
            "osmosis-1",
            identity("osmosis-1"),
            UnsignedIntent::DirectCosmosTx(osmo_send(RECIPIENT, "1", memo)),
        );
        let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert!(outcome.is_done(), "{:?}", outcome.error);
    }

    assert_eq!(broadcast_sequences(&broadcaster), vec![5, 6]);
}

fn broadcast_sequences(broadcaster: &RecordingBroadcaster) -> Vec<u64> {
    broadcaster
        .sent()
        .iter()
        .map(|(_, envelope, _)| {
            let tx_raw = cosmos::decode_tx_raw(envelope.bytes()).unwrap();
            let auth_info = cosmos::decode_auth_info(&tx_raw.auth_info_bytes).unwrap();
            auth_info.signer_infos[0].sequence
        })
        .collect()
}
