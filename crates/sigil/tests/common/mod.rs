//! # Test Utilities for Sigil
//!
//! Shared doubles for the dispatcher seams and a few helpers.
//!
//! - [`ScriptedProvider`] - chain state that becomes ready after N lookups
//! - [`ScriptedSigner`] - a [`LocalSigner`] that can decline, hang, cancel
//!   or rewrite the memo before signing
//! - [`RecordingBroadcaster`] - keeps every envelope it is handed
//!
//! ## Proptest Strategies
//!
//! - [`account_bytes`] - 20-byte accounts
//! - [`hrp`] - bech32 human-readable parts

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use proptest::prelude::*;
use sigil::resolver::RetryPolicy;
use sigil::{
    Broadcaster, ChainStateProvider, DirectSignDoc, DirectSignResponse, Dispatcher,
    ExternalSigner, LocalSigner, SignedEnvelope, SignerError,
};
use sigil_chain::cosmos::{self, proto};
use sigil_chain::{ChainRegistry, StdSignature};
use sigil_core::error::{BroadcastError, ResolveError};
use sigil_core::types::{
    AccountState, BroadcastMode, ChainDescriptor, Coin, CosmosFee, DirectCosmosTx, EthSignType,
    EvmTransaction, EvmTxKind, FeeData, SignerIdentity, UnsignedIntent,
};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Secret key `1`. Its EVM address is `0x7e5f4552091a69125d5dfcb7b8c2659029395bdf`.
pub const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

/// Create an isolated temporary directory.
pub fn temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

pub fn local_signer() -> LocalSigner {
    LocalSigner::from_hex(KEY_ONE, ChainRegistry::new()).expect("valid key")
}

pub fn chain(chain_id: &str) -> ChainDescriptor {
    ChainRegistry::new()
        .get(chain_id)
        .expect("built-in chain")
        .clone()
}

/// Key one's identity on `chain_id`.
pub fn identity(chain_id: &str) -> SignerIdentity {
    local_signer().identity(&chain(chain_id)).expect("identity")
}

/// A bank send of `amount` uosmo from key one, without account fields.
pub fn osmo_send(to: &str, amount: &str, memo: &str) -> DirectCosmosTx {
    let from = identity("osmosis-1").textual_address;
    DirectCosmosTx {
        messages: vec![cosmos::msg_send(&from, to, &[Coin::new("uosmo", amount)])],
        memo: memo.to_string(),
        timeout_height: 0,
        fee: CosmosFee {
            amount: vec![Coin::new("uosmo", "2500")],
            gas_limit: 200_000,
            ..CosmosFee::default()
        },
        account_number: 0,
        sequence: 0,
    }
}

/// An EVM transfer on evmos with everything but the nonce filled in.
pub fn evmos_transfer(kind: EvmTxKind) -> EvmTransaction {
    EvmTransaction {
        kind,
        to: Some("0x000000000000000000000000000000000000dead".parse().expect("address")),
        value: alloy_primitives::U256::from(1_000u64),
        data: alloy_primitives::Bytes::new(),
        gas_limit: 21_000,
        nonce: 0,
        chain_numeric_id: 9001,
        access_list: matches!(kind, EvmTxKind::Eip2930).then(Vec::new),
        max_priority_fee_per_gas: None,
        max_fee_per_gas: None,
        gas_price: None,
    }
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        interval: Duration::from_millis(100),
    }
}

/// A dispatcher with key one, `provider` and a recording broadcaster.
pub fn dispatcher(
    signer: Arc<dyn ExternalSigner>,
    provider: Arc<ScriptedProvider>,
    broadcaster: Arc<RecordingBroadcaster>,
) -> Dispatcher {
    Dispatcher::new(ChainRegistry::new(), signer, provider).with_broadcaster(broadcaster)
}

pub fn arbitrary_intent(payload: &[u8]) -> UnsignedIntent {
    UnsignedIntent::ArbitraryBytes {
        payload: payload.to_vec(),
    }
}

// ============================================================================
// ScriptedProvider
// ============================================================================

/// Chain state that reports "not found" for the first `not_ready_for`
/// lookups of each kind.
#[derive(Debug)]
pub struct ScriptedProvider {
    pub not_ready_for: u32,
    pub account: AccountState,
    pub nonce: u64,
    pub fees: FeeData,
    pub account_calls: AtomicU32,
    pub nonce_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn ready() -> Self {
        Self::not_ready_for(0)
    }

    pub fn not_ready_for(lookups: u32) -> Self {
        Self {
            not_ready_for: lookups,
            account: AccountState {
                account_number: 42,
                sequence: 5,
            },
            nonce: 3,
            fees: FeeData {
                gas_price: Some(1_000_000_000),
                max_fee_per_gas: Some(3_000_000_000),
                max_priority_fee_per_gas: Some(1_000_000_000),
            },
            account_calls: AtomicU32::new(0),
            nonce_calls: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self::not_ready_for(u32::MAX)
    }

    pub fn account_lookups(&self) -> u32 {
        self.account_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainStateProvider for ScriptedProvider {
    async fn account(
        &self,
        _chain: &ChainDescriptor,
        _address: &str,
    ) -> Result<Option<AccountState>, ResolveError> {
        let seen = self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok((seen >= self.not_ready_for).then_some(self.account))
    }

    async fn nonce(&self, _chain: &ChainDescriptor, _address: &str) -> Result<u64, ResolveError> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonce)
    }

    async fn estimate_gas(
        &self,
        _chain: &ChainDescriptor,
        _from: &str,
        _tx: &EvmTransaction,
    ) -> Result<u64, ResolveError> {
        Ok(21_000)
    }

    async fn fee_data(&self, _chain: &ChainDescriptor) -> Result<FeeData, ResolveError> {
        Ok(self.fees)
    }
}

// ============================================================================
// ScriptedSigner
// ============================================================================

/// How [`ScriptedSigner`] answers.
#[derive(Debug, Clone)]
pub enum SignerMode {
    /// Sign normally.
    Sign,
    /// Decline every request.
    Reject,
    /// Never answer.
    Hang,
    /// Replace the memo of a direct sign document, then sign.
    RewriteMemo(String),
    /// Cancel the token, then sign anyway.
    CancelThenSign(CancellationToken),
    /// Sign, and cancel the token while verifying an arbitrary signature.
    CancelOnVerify(CancellationToken),
}

pub struct ScriptedSigner {
    inner: LocalSigner,
    mode: SignerMode,
    pub requests: AtomicU32,
    pub entered: Notify,
}

impl ScriptedSigner {
    pub fn new(mode: SignerMode) -> Self {
        Self {
            inner: local_signer(),
            mode,
            requests: AtomicU32::new(0),
            entered: Notify::new(),
        }
    }

    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), SignerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        match &self.mode {
            SignerMode::Reject => Err(SignerError::Rejected("user declined".to_string())),
            SignerMode::Hang => std::future::pending().await,
            SignerMode::CancelThenSign(cancel) => {
                cancel.cancel();
                Ok(())
            }
            SignerMode::Sign | SignerMode::RewriteMemo(_) | SignerMode::CancelOnVerify(_) => Ok(()),
        }
    }
}

#[async_trait]
impl ExternalSigner for ScriptedSigner {
    async fn sign_direct(
        &self,
        chain_id: &str,
        signer_address: &str,
        mut doc: DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        self.gate().await?;
        if let SignerMode::RewriteMemo(memo) = &self.mode {
            let mut body = proto::TxBody::decode(doc.body_bytes.as_slice())
                .map_err(|e| SignerError::Failed(e.to_string()))?;
            body.memo.clone_from(memo);
            doc.body_bytes = body.encode_to_vec();
        }
        self.inner.sign_direct(chain_id, signer_address, doc).await
    }

    async fn sign_ethereum(
        &self,
        chain_id: &str,
        signer_address: &str,
        payload: &[u8],
        sign_type: EthSignType,
    ) -> Result<Vec<u8>, SignerError> {
        self.gate().await?;
        self.inner
            .sign_ethereum(chain_id, signer_address, payload, sign_type)
            .await
    }

    async fn sign_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
    ) -> Result<StdSignature, SignerError> {
        self.gate().await?;
        self.inner.sign_arbitrary(chain_id, signer_address, data).await
    }

    async fn verify_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
        signature: &StdSignature,
    ) -> Result<bool, SignerError> {
        if let SignerMode::CancelOnVerify(cancel) = &self.mode {
            cancel.cancel();
        }
        self.inner
            .verify_arbitrary(chain_id, signer_address, data, signature)
            .await
    }
}

// ============================================================================
// RecordingBroadcaster
// ============================================================================

/// Keeps every broadcast and answers with the local hash, or fails with
/// `failure` when set.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    pub sent: Mutex<Vec<(String, SignedEnvelope, BroadcastMode)>>,
    pub failure: Option<BroadcastError>,
}

impl RecordingBroadcaster {
    pub fn failing(failure: BroadcastError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(failure),
        }
    }

    pub fn sent(&self) -> Vec<(String, SignedEnvelope, BroadcastMode)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(
        &self,
        chain: &ChainDescriptor,
        envelope: &SignedEnvelope,
        mode: BroadcastMode,
    ) -> Result<String, BroadcastError> {
        self.sent
            .lock()
            .unwrap()
            .push((chain.chain_id.clone(), envelope.clone(), mode));
        match &self.failure {
            Some(BroadcastError::Rejected { code, log }) => Err(BroadcastError::Rejected {
                code: *code,
                log: log.clone(),
            }),
            Some(BroadcastError::Failure { context }) => Err(BroadcastError::Failure {
                context: context.clone(),
            }),
            None => Ok(envelope.local_hash()),
        }
    }
}

// ============================================================================
// Proptest strategies
// ============================================================================

/// Arbitrary 20-byte accounts.
pub fn account_bytes() -> impl Strategy<Value = [u8; 20]> {
    prop::array::uniform20(any::<u8>())
}

/// Lowercase bech32 human-readable parts.
pub fn hrp() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}
