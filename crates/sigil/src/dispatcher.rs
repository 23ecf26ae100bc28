//! The signing dispatcher.
//!
//! One dispatch per request, driven through a fixed state machine:
//!
//! ```text
//! Idle -> ResolvingState -> Encoding -> AwaitingExternalSignature -> Assembling -> Done
//!                      any step may end in Rejected or Failed
//! ```
//!
//! `Rejected` covers a declined signature and caller cancellation; every
//! other error ends in `Failed`. Nothing is broadcast after either.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use sigil_chain::verifier::verify_std_signature;
use sigil_chain::{
    check_identity, cosmos, evm, ChainRegistry, EncodedPayload, PayloadEncoder, RecoverInput,
    SignerIdentityExt, StdSignature,
};
use sigil_core::config::{BroadcastConfig, Config};
use sigil_core::error::{RecoveryError, ResolveError, SigilError, SignError};
use sigil_core::types::{
    BroadcastMode, ChainDescriptor, EthSignType, SignedResult, SignerIdentity, UnsignedIntent,
    VerificationOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::broadcast::{Broadcaster, HttpBroadcaster, SignedEnvelope};
use crate::logging::{log_audit_event, new_correlation_id, redact_bytes};
use crate::provider::{ChainStateProvider, HttpChainStateProvider};
use crate::resolver::{FeeNonceResolver, RetryPolicy, SequenceLanes};
use crate::signer::{DirectSignDoc, DirectSignResponse, ExternalSigner, SignerError};

// ============================================================================
// State
// ============================================================================

/// Dispatcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Request received.
    Idle,
    /// Reading account state, nonce and fees.
    ResolvingState,
    /// Producing canonical bytes.
    Encoding,
    /// Waiting on the external signer.
    AwaitingExternalSignature,
    /// Building the signed envelope, verifying, broadcasting.
    Assembling,
    /// Finished successfully.
    Done,
    /// Declined by the signer or cancelled by the caller.
    Rejected,
    /// Any other failure.
    Failed,
}

impl DispatchState {
    /// Returns `true` for `Done`, `Rejected` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Rejected | Self::Failed)
    }

    /// Name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingState => "resolving_state",
            Self::Encoding => "encoding",
            Self::AwaitingExternalSignature => "awaiting_external_signature",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Target chain.
    pub chain_id: String,
    /// Who signs.
    pub identity: SignerIdentity,
    /// What gets signed.
    pub intent: UnsignedIntent,
}

impl SigningRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(chain_id: impl Into<String>, identity: SignerIdentity, intent: UnsignedIntent) -> Self {
        Self {
            chain_id: chain_id.into(),
            identity,
            intent,
        }
    }
}

/// Everything a dispatch produced, including how far it got.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Correlation id of the dispatch span.
    pub correlation_id: String,
    /// Every state entered, starting with `Idle`.
    pub trail: Vec<DispatchState>,
    /// What the signer returned.
    pub signed: Option<SignedResult>,
    /// The assembled transaction, for transaction intents.
    pub envelope: Option<SignedEnvelope>,
    /// Hash reported by the broadcaster.
    pub tx_hash: Option<String>,
    /// Result of the identity check, for identity-proving intents.
    pub verification: Option<VerificationOutcome>,
    /// Why the dispatch ended in `Rejected` or `Failed`.
    pub error: Option<SigilError>,
}

impl DispatchOutcome {
    fn new(correlation_id: String) -> Self {
        Self {
            correlation_id,
            trail: vec![DispatchState::Idle],
            signed: None,
            envelope: None,
            tx_hash: None,
            verification: None,
            error: None,
        }
    }

    /// The final state.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.trail.last().copied().unwrap_or(DispatchState::Idle)
    }

    /// Returns `true` if the dispatch completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state() == DispatchState::Done
    }

    /// Returns `true` if the dispatch passed through `state`.
    #[must_use]
    pub fn visited(&self, state: DispatchState) -> bool {
        self.trail.contains(&state)
    }

    /// Converts into a `Result`, keeping the outcome on success.
    ///
    /// # Errors
    ///
    /// Returns the recorded error of a rejected or failed dispatch.
    pub fn into_result(mut self) -> Result<Self, SigilError> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn enter(&mut self, next: DispatchState) {
        tracing::debug!(
            target: "sigil::dispatcher",
            from = %self.state(),
            to = %next,
            "state transition"
        );
        self.trail.push(next);
    }

    fn terminate(&mut self, err: SigilError) {
        let kind = err.kind();
        if kind.is_user_rejection() {
            tracing::info!(target: "sigil::dispatcher", kind = kind.as_str(), error = %err, "request rejected");
            self.enter(DispatchState::Rejected);
        } else {
            tracing::warn!(target: "sigil::dispatcher", kind = kind.as_str(), error = %err, "request failed");
            self.enter(DispatchState::Failed);
        }
        self.error = Some(err);
    }
}

enum SignerReply {
    Direct(DirectSignResponse),
    Ethereum(Vec<u8>),
    Arbitrary(StdSignature),
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes signing requests through resolution, encoding, the external signer
/// and assembly.
///
/// Cheap to share: wrap it in an `Arc` and dispatch from many tasks.
/// Requests for the same chain and signer are serialized from resolution
/// through broadcast so they never consume the same sequence.
pub struct Dispatcher {
    signer: Arc<dyn ExternalSigner>,
    resolver: FeeNonceResolver,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    registry: ChainRegistry,
    broadcast_config: BroadcastConfig,
    lanes: SequenceLanes,
    encoder: PayloadEncoder,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("has_broadcaster", &self.broadcaster.is_some())
            .field("broadcast_config", &self.broadcast_config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher without a broadcaster.
    #[must_use]
    pub fn new(
        registry: ChainRegistry,
        signer: Arc<dyn ExternalSigner>,
        provider: Arc<dyn ChainStateProvider>,
    ) -> Self {
        Self {
            signer,
            resolver: FeeNonceResolver::new(provider),
            broadcaster: None,
            registry,
            broadcast_config: BroadcastConfig::default(),
            lanes: SequenceLanes::new(),
            encoder: PayloadEncoder::new(),
        }
    }

    /// HTTP provider and broadcaster built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SigilError::Config`] for an invalid config and
    /// [`SigilError::Resolve`] or [`SigilError::Broadcast`] if an HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config, signer: Arc<dyn ExternalSigner>) -> Result<Self, SigilError> {
        config.validate()?;
        let timeout = config.resolver.request_timeout();
        let provider = HttpChainStateProvider::new(timeout)?;

        let dispatcher = Self::new(ChainRegistry::with_config(config), signer, Arc::new(provider))
            .with_retry_policy(RetryPolicy::from_config(&config.resolver))
            .with_broadcast_config(config.broadcast.clone());
        if config.broadcast.enabled {
            Ok(dispatcher.with_broadcaster(Arc::new(HttpBroadcaster::new(timeout)?)))
        } else {
            Ok(dispatcher)
        }
    }

    /// Sets the broadcaster for signed transactions.
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Replaces the resolver's retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.resolver = self.resolver.with_policy(policy);
        self
    }

    /// Replaces the broadcast settings.
    #[must_use]
    pub fn with_broadcast_config(mut self, config: BroadcastConfig) -> Self {
        self.broadcast_config = config;
        self
    }

    /// The chain registry.
    #[must_use]
    pub const fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Dispatches with the configured broadcast mode of the chain's family.
    pub async fn dispatch(
        &self,
        request: SigningRequest,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        self.dispatch_with_mode(request, None, cancel).await
    }

    /// Dispatches `request`, broadcasting with `mode` if given.
    ///
    /// Never returns an error directly: the outcome records the final state
    /// and, for `Rejected` or `Failed`, the error.
    pub async fn dispatch_with_mode(
        &self,
        request: SigningRequest,
        mode: Option<BroadcastMode>,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::new(new_correlation_id());
        let span = crate::with_correlation_id!(
            &outcome.correlation_id,
            "dispatch",
            chain_id = %request.chain_id,
            intent = request.intent.name()
        );

        async {
            match self.run(request, mode, cancel, &mut outcome).await {
                Ok(()) => outcome.enter(DispatchState::Done),
                Err(err) => outcome.terminate(err),
            }
        }
        .instrument(span)
        .await;

        outcome
    }

    async fn run(
        &self,
        request: SigningRequest,
        mode: Option<BroadcastMode>,
        cancel: &CancellationToken,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), SigilError> {
        let SigningRequest {
            chain_id,
            identity,
            mut intent,
        } = request;
        let chain = self.registry.resolve(&chain_id)?;

        outcome.enter(DispatchState::ResolvingState);
        let mut lane = if intent.is_transaction() {
            let lane = self.lanes.acquire(&chain.chain_id, &identity.textual_address);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResolveError::Cancelled.into()),
                guard = lane => Some(guard),
            }
        } else {
            None
        };
        self.resolver
            .resolve(chain, &identity, &mut intent, cancel)
            .await?;
        if let (Some(lane), Some(sequence)) = (lane.as_mut(), intent.sequence_mut()) {
            let reserved = lane.reserve(*sequence);
            if reserved != *sequence {
                tracing::debug!(
                    target: "sigil::dispatcher",
                    chain_sequence = *sequence,
                    reserved,
                    "sequence advanced past last used"
                );
            }
            *sequence = reserved;
        }
        identity.verify_consistency(chain)?;

        outcome.enter(DispatchState::Encoding);
        let payload = self.encoder.encode(chain, &identity, &intent)?;

        outcome.enter(DispatchState::AwaitingExternalSignature);
        tracing::info!(
            target: "sigil::dispatcher",
            payload = payload.kind(),
            signer = %identity.textual_address,
            "awaiting external signature"
        );
        let reply = self
            .request_signature(chain, &identity, &payload, cancel)
            .await?;
        // The signer may have answered just as the caller gave up.
        if cancel.is_cancelled() {
            return Err(SignError::Cancelled.into());
        }
        log_audit_event("signed", &chain.chain_id, payload.kind());

        outcome.enter(DispatchState::Assembling);
        self.assemble(chain, &identity, &intent, &payload, reply, cancel, outcome)
            .await?;

        if cancel.is_cancelled() {
            return Err(SignError::Cancelled.into());
        }
        if let Some(envelope) = &outcome.envelope {
            if let Some(broadcaster) = self.broadcaster.as_ref().filter(|_| self.broadcast_config.enabled) {
                let mode = mode.unwrap_or_else(|| self.broadcast_config.mode_for(chain.family));
                let hash = broadcaster.broadcast(chain, envelope, mode).await?;
                log_audit_event("broadcast", &chain.chain_id, &hash);
                outcome.tx_hash = Some(hash);
            }
            // A failed broadcast leaves the sequence free for the next request.
            if let Some(lane) = lane.as_mut() {
                lane.commit();
            }
        }
        Ok(())
    }

    async fn request_signature(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        payload: &EncodedPayload,
        cancel: &CancellationToken,
    ) -> Result<SignerReply, SignError> {
        let chain_id = chain.chain_id.as_str();
        let address = identity.textual_address.as_str();
        let signer = &self.signer;

        let call = async move {
            match payload {
                EncodedPayload::CosmosDirect(direct) => signer
                    .sign_direct(chain_id, address, DirectSignDoc::from(direct))
                    .await
                    .map(SignerReply::Direct),
                EncodedPayload::EvmTransaction { unsigned, .. } => signer
                    .sign_ethereum(chain_id, address, unsigned, EthSignType::Transaction)
                    .await
                    .map(SignerReply::Ethereum),
                EncodedPayload::TypedData { json, .. } => signer
                    .sign_ethereum(chain_id, address, json, EthSignType::Eip712)
                    .await
                    .map(SignerReply::Ethereum),
                EncodedPayload::PersonalMessage { message, .. } => signer
                    .sign_ethereum(chain_id, address, message, EthSignType::Message)
                    .await
                    .map(SignerReply::Ethereum),
                EncodedPayload::Adr36 { signer: bech32, data, .. } => signer
                    .sign_arbitrary(chain_id, bech32, data)
                    .await
                    .map(SignerReply::Arbitrary),
            }
        };
        until_cancelled(cancel, call).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        intent: &UnsignedIntent,
        payload: &EncodedPayload,
        reply: SignerReply,
        cancel: &CancellationToken,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), SigilError> {
        match (payload, intent, reply) {
            (EncodedPayload::CosmosDirect(_), _, SignerReply::Direct(response)) => {
                // The echoed bytes are what was signed; ours may be stale.
                let DirectSignResponse { signed, signature } = response;
                let tx_raw =
                    cosmos::assemble_tx_raw(&signed.body_bytes, &signed.auth_info_bytes, &signature);
                tracing::debug!(
                    target: "sigil::dispatcher",
                    signature = %redact_bytes(&signature),
                    tx_raw_len = tx_raw.len(),
                    "assembled cosmos tx"
                );
                outcome.signed = Some(SignedResult {
                    signature,
                    public_key: Some(identity.public_key.clone()),
                    signed_payload: Some(signed),
                });
                outcome.envelope = Some(SignedEnvelope::CosmosTxRaw(tx_raw));
                Ok(())
            }
            (
                EncodedPayload::EvmTransaction { .. },
                UnsignedIntent::EvmTransaction(tx),
                SignerReply::Ethereum(bytes),
            ) => {
                let envelope = if bytes.len() == 65 {
                    evm::assemble_signed(tx, &bytes)?
                } else {
                    let summary = evm::inspect_signed(tx, &bytes)?;
                    tracing::debug!(
                        target: "sigil::dispatcher",
                        hash = %summary.hash,
                        "signer returned a signed envelope"
                    );
                    bytes.clone()
                };
                outcome.signed = Some(SignedResult {
                    signature: bytes,
                    public_key: Some(identity.public_key.clone()),
                    signed_payload: None,
                });
                outcome.envelope = Some(SignedEnvelope::EvmRaw(envelope));
                Ok(())
            }
            (EncodedPayload::TypedData { document, .. }, _, SignerReply::Ethereum(signature)) => {
                record_recovered(RecoverInput::TypedData(document), signature, identity, outcome)
            }
            (EncodedPayload::PersonalMessage { message, .. }, _, SignerReply::Ethereum(signature)) => {
                record_recovered(RecoverInput::PersonalMessage(message), signature, identity, outcome)
            }
            (EncodedPayload::Adr36 { signer, data, .. }, _, SignerReply::Arbitrary(signature)) => {
                let local = verify_std_signature(chain, signer, data, &signature);
                let remote = until_cancelled(
                    cancel,
                    self.signer
                        .verify_arbitrary(&chain.chain_id, signer, data, &signature),
                )
                .await?;

                let public_key = signature.public_key_bytes().ok();
                let recovered_identity = public_key
                    .as_deref()
                    .and_then(|pk| SignerIdentity::from_public_key(chain, pk).ok())
                    .map(|id| id.textual_address)
                    .unwrap_or_default();
                let matched = local && remote;

                outcome.signed = Some(SignedResult {
                    signature: signature.signature_bytes()?,
                    public_key,
                    signed_payload: None,
                });
                outcome.verification = Some(VerificationOutcome {
                    matched,
                    recovered_identity: recovered_identity.clone(),
                });
                if matched {
                    Ok(())
                } else {
                    tracing::warn!(
                        target: "sigil::dispatcher",
                        local,
                        remote,
                        "arbitrary signature did not verify"
                    );
                    Err(RecoveryError::identity_mismatch(signer, recovered_identity).into())
                }
            }
            (payload, _, _) => Err(SignError::failed(format!(
                "signer reply does not match a {} request",
                payload.kind()
            ))
            .into()),
        }
    }
}

/// Recovers the signer of an EVM identity proof and records the result.
fn record_recovered(
    input: RecoverInput<'_>,
    signature: Vec<u8>,
    identity: &SignerIdentity,
    outcome: &mut DispatchOutcome,
) -> Result<(), SigilError> {
    let verification = check_identity(input, &signature, &identity.raw_hex_address)?;
    let matched = verification.matched;
    let recovered = verification.recovered_identity.clone();

    outcome.signed = Some(SignedResult {
        signature,
        public_key: None,
        signed_payload: None,
    });
    outcome.verification = Some(verification);

    if matched {
        Ok(())
    } else {
        Err(RecoveryError::identity_mismatch(&identity.raw_hex_address, recovered).into())
    }
}

/// Races a signer call against cancellation.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, SignerError>>,
) -> Result<T, SignError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SignError::Cancelled),
        result = call => result.map_err(SignError::from),
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::indexing_slicing
    )]

    use super::*;
    use crate::signer::LocalSigner;
    use async_trait::async_trait;
    use sigil_core::error::ErrorKind;
    use sigil_core::types::{AccountState, EvmTransaction, FeeData};

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    struct ReadyProvider;

    #[async_trait]
    impl ChainStateProvider for ReadyProvider {
        async fn account(
            &self,
            _chain: &ChainDescriptor,
            _address: &str,
        ) -> Result<Option<AccountState>, ResolveError> {
            Ok(Some(AccountState {
                account_number: 1,
                sequence: 0,
            }))
        }

        async fn nonce(&self, _chain: &ChainDescriptor, _address: &str) -> Result<u64, ResolveError> {
            Ok(0)
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
            Ok(FeeData::default())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<LocalSigner>) {
        let signer = Arc::new(LocalSigner::from_hex(KEY_ONE, ChainRegistry::new()).unwrap());
        let dispatcher = Dispatcher::new(ChainRegistry::new(), signer.clone(), Arc::new(ReadyProvider));
        (dispatcher, signer)
    }

    #[test]
    fn test_terminal_states() {
        assert!(DispatchState::Done.is_terminal());
        assert!(DispatchState::Rejected.is_terminal());
        assert!(DispatchState::Failed.is_terminal());
        assert!(!DispatchState::Assembling.is_terminal());
        assert_eq!(
            DispatchState::AwaitingExternalSignature.to_string(),
            "awaiting_external_signature"
        );
    }

    #[tokio::test]
    async fn test_unknown_chain_fails_from_idle() {
        let (dispatcher, signer) = dispatcher();
        let chain = ChainRegistry::new().get("osmosis-1").unwrap().clone();
        let request = SigningRequest::new(
            "juno-1",
            signer.identity(&chain).unwrap(),
            UnsignedIntent::ArbitraryBytes { payload: vec![1] },
        );
        let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

        assert_eq!(outcome.trail, vec![DispatchState::Idle, DispatchState::Failed]);
        assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::UnknownChain);
    }

    #[tokio::test]
    async fn test_arbitrary_bytes_verified() {
        let (dispatcher, signer) = dispatcher();
        let chain = dispatcher.registry().get("osmosis-1").unwrap().clone();
        let identity = signer.identity(&chain).unwrap();
        let request = SigningRequest::new(
            "osmosis-1",
            identity.clone(),
            UnsignedIntent::ArbitraryBytes {
                payload: b"login nonce 42".to_vec(),
            },
        );
        let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

        assert!(outcome.is_done(), "{:?}", outcome.error);
        let verification = outcome.verification.as_ref().unwrap();
        assert!(verification.matched);
        assert_eq!(verification.recovered_identity, identity.textual_address);
        assert!(outcome.envelope.is_none());
        assert_eq!(outcome.signed.unwrap().signature.len(), 64);
    }

    #[tokio::test]
    async fn test_family_mismatch_fails_in_encoding() {
        let (dispatcher, signer) = dispatcher();
        let chain = dispatcher.registry().get("osmosis-1").unwrap().clone();
        let request = SigningRequest::new(
            "osmosis-1",
            signer.identity(&chain).unwrap(),
            UnsignedIntent::EthereumMessage {
                payload: b"hi".to_vec(),
            },
        );
        let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

        assert_eq!(outcome.state(), DispatchState::Failed);
        assert!(outcome.visited(DispatchState::Encoding));
        assert!(!outcome.visited(DispatchState::AwaitingExternalSignature));
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_inconsistent_identity_fails() {
        let (dispatcher, signer) = dispatcher();
        let chain = dispatcher.registry().get("osmosis-1").unwrap().clone();
        let mut identity = signer.identity(&chain).unwrap();
        identity.raw_hex_address = format!("0x{}", "11".repeat(20));
        let request = SigningRequest::new(
            "osmosis-1",
            identity,
            UnsignedIntent::ArbitraryBytes { payload: vec![1] },
        );
        let outcome = dispatcher.dispatch(request, &CancellationToken::new()).await;

        assert_eq!(outcome.state(), DispatchState::Failed);
        assert_eq!(outcome.error.unwrap().kind(), ErrorKind::AddressFormat);
    }

    #[test]
    fn test_dispatcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
        assert_send_sync::<DispatchOutcome>();
    }
}
