//! Fills the mutable fields of an intent from live chain state.
//!
//! Account numbers, sequences and nonces only ever grow, so they are read
//! immediately before encoding. A missing account (or an identity that is not
//! bound yet) is polled at a fixed interval up to a ceiling; every other
//! provider failure surfaces at once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sigil_core::config::ResolverConfig;
use sigil_core::error::ResolveError;
use sigil_core::types::{
    AccountState, ChainDescriptor, EvmTransaction, EvmTxKind, SignerIdentity, UnsignedIntent,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::provider::ChainStateProvider;

/// Bounded retry for "account not ready yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least one attempt is always made.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Builds a policy from the `[resolver]` config section.
    #[must_use]
    pub const fn from_config(config: &ResolverConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            interval: config.retry_interval(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(100),
        }
    }
}

/// Fee & nonce resolver.
#[derive(Clone)]
pub struct FeeNonceResolver {
    provider: Arc<dyn ChainStateProvider>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for FeeNonceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeNonceResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FeeNonceResolver {
    /// Creates a resolver with the default retry policy.
    #[must_use]
    pub fn new(provider: Arc<dyn ChainStateProvider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fills `intent` in place.
    ///
    /// Cosmos transactions, including amino ones wrapped in EIP-712, get
    /// account number and sequence. EVM transactions
    /// always get a fresh nonce; gas limit, chain id and the fee fields of
    /// their `kind` are filled only when the caller left them empty.
    /// Non-transaction intents only need a bound identity.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::AccountNotReady`] once the retry ceiling is reached
    /// - [`ResolveError::Cancelled`] if `cancel` fires while polling
    /// - [`ResolveError::Provider`] for any provider failure
    pub async fn resolve(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        intent: &mut UnsignedIntent,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveError> {
        match intent {
            UnsignedIntent::DirectCosmosTx(tx) => {
                let account = self.cosmos_account(chain, identity, cancel).await?;
                tx.account_number = account.account_number;
                tx.sequence = account.sequence;
                Ok(())
            }
            UnsignedIntent::Eip712CosmosTx(tx) => {
                let account = self.cosmos_account(chain, identity, cancel).await?;
                tx.account_number = account.account_number;
                tx.sequence = account.sequence;
                Ok(())
            }
            UnsignedIntent::EvmTransaction(tx) => {
                self.resolve_evm(chain, identity, tx, cancel).await
            }
            UnsignedIntent::TypedData(_)
            | UnsignedIntent::ArbitraryBytes { .. }
            | UnsignedIntent::EthereumMessage { .. } => {
                self.poll(chain, identity, cancel, move || async move {
                    Ok(identity.is_bound().then_some(()))
                })
                .await
            }
        }
    }

    async fn cosmos_account(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        cancel: &CancellationToken,
    ) -> Result<AccountState, ResolveError> {
        let provider = &self.provider;
        let account = self
            .poll(chain, identity, cancel, move || async move {
                if !identity.is_bound() {
                    return Ok(None);
                }
                provider.account(chain, &identity.textual_address).await
            })
            .await?;

        tracing::debug!(
            target: "sigil::resolver",
            chain_id = %chain.chain_id,
            account_number = account.account_number,
            sequence = account.sequence,
            "resolved cosmos account"
        );
        Ok(account)
    }

    async fn resolve_evm(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        tx: &mut EvmTransaction,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveError> {
        self.poll(chain, identity, cancel, move || async move {
            Ok(identity.is_bound().then_some(()))
        })
        .await?;

        let from = identity.raw_hex_address.as_str();
        tx.nonce = self.provider.nonce(chain, from).await?;

        if tx.chain_numeric_id == 0 {
            if let Some(id) = chain.evm_chain_id {
                tx.chain_numeric_id = id;
            }
        }
        if tx.gas_limit == 0 {
            tx.gas_limit = self.provider.estimate_gas(chain, from, tx).await?;
        }

        let needs_fees = match tx.kind {
            EvmTxKind::Legacy | EvmTxKind::Eip2930 => tx.gas_price.is_none(),
            EvmTxKind::Eip1559 => {
                tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none()
            }
        };
        if needs_fees {
            let fees = self.provider.fee_data(chain).await?;
            match tx.kind {
                EvmTxKind::Legacy | EvmTxKind::Eip2930 => {
                    tx.gas_price = fees.gas_price.or(fees.max_fee_per_gas);
                }
                EvmTxKind::Eip1559 => {
                    tx.max_fee_per_gas = tx.max_fee_per_gas.or(fees.max_fee_per_gas);
                    tx.max_priority_fee_per_gas = tx
                        .max_priority_fee_per_gas
                        .or(fees.max_priority_fee_per_gas);
                }
            }
        }

        tracing::debug!(
            target: "sigil::resolver",
            chain_id = %chain.chain_id,
            nonce = tx.nonce,
            gas_limit = tx.gas_limit,
            kind = tx.kind.as_str(),
            "resolved evm transaction"
        );
        Ok(())
    }

    /// Runs `lookup` until it yields a value, the ceiling is reached or
    /// `cancel` fires. `Ok(None)` from the lookup means "not ready yet".
    async fn poll<T, F, Fut>(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        cancel: &CancellationToken,
        mut lookup: F,
    ) -> Result<T, ResolveError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, ResolveError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            attempt += 1;
            if let Some(value) = lookup().await? {
                return Ok(value);
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    target: "sigil::resolver",
                    chain_id = %chain.chain_id,
                    address = %identity.textual_address,
                    attempts = attempt,
                    "account not ready, giving up"
                );
                return Err(ResolveError::account_not_ready(
                    &chain.chain_id,
                    &identity.textual_address,
                    attempt,
                ));
            }

            tracing::debug!(
                target: "sigil::resolver",
                chain_id = %chain.chain_id,
                attempt,
                max_attempts,
                "account not ready, retrying"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResolveError::Cancelled),
                () = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }
}

/// Serializes requests that read and consume the same account sequence.
///
/// A lane is keyed by chain id and signer address; holding its guard keeps
/// every other request for the same pair waiting. Lanes for different pairs
/// never block each other.
///
/// Each lane also remembers the last sequence committed through it. A node
/// that has not yet applied the previous transaction reports a stale
/// sequence, so the next request signs with one past the committed value
/// instead.
#[derive(Debug, Clone, Default)]
pub struct SequenceLanes {
    lanes: Arc<Mutex<HashMap<(String, String), Arc<Mutex<LaneState>>>>>,
}

#[derive(Debug, Default)]
struct LaneState {
    last_used: Option<u64>,
}

/// Exclusive use of one lane, released on drop.
#[derive(Debug)]
pub struct LaneGuard {
    state: OwnedMutexGuard<LaneState>,
    reserved: Option<u64>,
}

impl LaneGuard {
    /// The sequence to sign with when the chain reports `chain_sequence`.
    ///
    /// Never lower than one past the last committed sequence of this lane.
    pub fn reserve(&mut self, chain_sequence: u64) -> u64 {
        let next = self
            .state
            .last_used
            .map_or(chain_sequence, |last| chain_sequence.max(last.saturating_add(1)));
        self.reserved = Some(next);
        next
    }

    /// Records the reserved sequence as consumed.
    pub fn commit(&mut self) {
        if let Some(sequence) = self.reserved.take() {
            self.state.last_used = Some(sequence);
        }
    }

    /// The last sequence committed through this lane.
    #[must_use]
    pub fn last_used(&self) -> Option<u64> {
        self.state.last_used
    }
}

impl SequenceLanes {
    /// Creates an empty set of lanes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive use of the `(chain_id, address)` lane.
    pub async fn acquire(&self, chain_id: &str, address: &str) -> LaneGuard {
        let lane = {
            let mut lanes = self.lanes.lock().await;
            // Drop lanes nobody holds or waits on and that never committed.
            lanes.retain(|_, lane| {
                Arc::strong_count(lane) > 1
                    || lane.try_lock().map_or(true, |state| state.last_used.is_some())
            });
            Arc::clone(
                lanes
                    .entry((chain_id.to_string(), address.to_string()))
                    .or_default(),
            )
        };
        LaneGuard {
            state: lane.lock_owned().await,
            reserved: None,
        }
    }

    /// Number of lanes currently tracked.
    pub async fn len(&self) -> usize {
        self.lanes.lock().await.len()
    }

    /// Returns `true` if no lane is tracked.
    pub async fn is_empty(&self) -> bool {
        self.lanes.lock().await.is_empty()
    }
}
