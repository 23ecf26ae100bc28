//! Core types for the Sigil signing core.
//!
//! This module provides the data model shared by every Sigil crate:
//!
//! - [`ChainDescriptor`] - Static description of a registered chain
//! - [`SignerIdentity`] - The signer's public key and both address renderings
//! - [`UnsignedIntent`] - What the caller wants signed
//! - [`SignedResult`] - What the external signer returned
//! - [`VerificationOutcome`] - Result of an identity check
//!
//! All values are per-request and never persisted.
//!
//! # Examples
//!
//! ```
//! use sigil_core::types::{UnsignedIntent, EvmTxKind};
//!
//! let json = r#"{
//!     "type": "evm_transaction",
//!     "kind": "eip1559",
//!     "to": "0x000000000000000000000000000000000000dead",
//!     "value": "0x2386f26fc10000",
//!     "gas_limit": 21000,
//!     "nonce": 0,
//!     "chain_numeric_id": 9000,
//!     "max_priority_fee_per_gas": 1500000000,
//!     "max_fee_per_gas": 30000000000
//! }"#;
//!
//! let intent: UnsignedIntent = serde_json::from_str(json).expect("valid intent");
//! match intent {
//!     UnsignedIntent::EvmTransaction(tx) => assert_eq!(tx.kind, EvmTxKind::Eip1559),
//!     _ => unreachable!(),
//! }
//! ```

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Chains
// ============================================================================

/// Blockchain family. Determines address derivation, payload encoding and
/// the digest used for signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    /// Cosmos SDK chains signing protobuf `SignDoc`s.
    CosmosSdk,
    /// Ethermint-style chains: bech32 addresses over a Keccak-derived account,
    /// EVM transaction signing.
    EvmCompatible,
}

impl ChainFamily {
    /// Returns the family name as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CosmosSdk => "cosmos-sdk",
            Self::EvmCompatible => "evm-compatible",
        }
    }

    /// Returns `true` for EVM-compatible chains.
    #[must_use]
    pub const fn is_evm(&self) -> bool {
        matches!(self, Self::EvmCompatible)
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A currency as described in a chain registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Display denomination, e.g. `OSMO`.
    pub denom: String,
    /// On-chain denomination, e.g. `uosmo`.
    pub minimal_denom: String,
    /// Decimal places between `minimal_denom` and `denom`.
    pub decimals: u8,
}

impl Currency {
    /// Creates a new currency.
    #[must_use]
    pub fn new(denom: impl Into<String>, minimal_denom: impl Into<String>, decimals: u8) -> Self {
        Self {
            denom: denom.into(),
            minimal_denom: minimal_denom.into(),
            decimals,
        }
    }
}

/// Static description of a chain. Immutable for the duration of a signing
/// session and looked up by `chain_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Chain identifier, e.g. `osmosis-1` or `evmos_9001-2`.
    pub chain_id: String,

    /// Chain family.
    pub family: ChainFamily,

    /// Human-readable bech32 prefix for account addresses.
    pub bech32_prefix: String,

    /// Currency used to pay fees.
    pub fee_currency: Currency,

    /// Staking currency, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_currency: Option<Currency>,

    /// EIP-155 chain id for EVM-compatible chains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_chain_id: Option<u64>,

    /// Cosmos REST (LCD) endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_endpoint: Option<String>,

    /// EVM JSON-RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_rpc_endpoint: Option<String>,
}

impl ChainDescriptor {
    /// Creates a Cosmos SDK chain descriptor without endpoints.
    #[must_use]
    pub fn cosmos(
        chain_id: impl Into<String>,
        bech32_prefix: impl Into<String>,
        fee_currency: Currency,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            family: ChainFamily::CosmosSdk,
            bech32_prefix: bech32_prefix.into(),
            fee_currency,
            stake_currency: None,
            evm_chain_id: None,
            rest_endpoint: None,
            evm_rpc_endpoint: None,
        }
    }

    /// Creates an EVM-compatible chain descriptor without endpoints.
    #[must_use]
    pub fn evm(
        chain_id: impl Into<String>,
        bech32_prefix: impl Into<String>,
        fee_currency: Currency,
        evm_chain_id: u64,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            family: ChainFamily::EvmCompatible,
            bech32_prefix: bech32_prefix.into(),
            fee_currency,
            stake_currency: None,
            evm_chain_id: Some(evm_chain_id),
            rest_endpoint: None,
            evm_rpc_endpoint: None,
        }
    }

    /// Sets the REST endpoint.
    #[must_use]
    pub fn with_rest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rest_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the EVM JSON-RPC endpoint.
    #[must_use]
    pub fn with_evm_rpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.evm_rpc_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the staking currency.
    #[must_use]
    pub fn with_stake_currency(mut self, currency: Currency) -> Self {
        self.stake_currency = Some(currency);
        self
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The signer's public key together with both renderings of its address.
///
/// Both address forms are deterministic functions of `public_key`; the
/// derivation lives next to the address codec so this crate stays free of
/// hashing dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerIdentity {
    /// Bech32 address, e.g. `osmo1...`.
    pub textual_address: String,

    /// Lowercase `0x`-prefixed hex of the 20-byte account.
    pub raw_hex_address: String,

    /// 33-byte compressed secp256k1 public key.
    #[serde(with = "hex_vec")]
    pub public_key: Vec<u8>,
}

impl SignerIdentity {
    /// Returns `true` if both address fields are populated.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.textual_address.is_empty() && !self.raw_hex_address.is_empty()
    }
}

// ============================================================================
// Intents
// ============================================================================

/// A protobuf `Any`: a type URL and the encoded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMessage {
    /// Fully qualified type URL, e.g. `/cosmos.bank.v1beta1.MsgSend`.
    pub type_url: String,
    /// Protobuf-encoded message.
    #[serde(with = "hex_vec")]
    pub value: Vec<u8>,
}

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// On-chain denomination.
    pub denom: String,
    /// Decimal integer amount.
    pub amount: String,
}

impl Coin {
    /// Creates a new coin.
    #[must_use]
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// Cosmos transaction fee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosFee {
    /// Fee amount.
    #[serde(default)]
    pub amount: Vec<Coin>,
    /// Gas limit.
    pub gas_limit: u64,
    /// Optional fee payer.
    #[serde(default)]
    pub payer: String,
    /// Optional fee granter.
    #[serde(default)]
    pub granter: String,
}

/// A Cosmos SDK transaction to be signed in direct mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectCosmosTx {
    /// Messages in execution order.
    pub messages: Vec<AnyMessage>,
    /// Free-form memo.
    #[serde(default)]
    pub memo: String,
    /// Block height after which the transaction is invalid (0 = none).
    #[serde(default)]
    pub timeout_height: u64,
    /// Fee.
    pub fee: CosmosFee,
    /// On-chain account number. Filled by the resolver.
    #[serde(default)]
    pub account_number: u64,
    /// Account sequence. Filled by the resolver.
    #[serde(default)]
    pub sequence: u64,
}

/// EVM transaction envelope kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvmTxKind {
    /// Pre-EIP-2718 transaction with EIP-155 replay protection.
    Legacy,
    /// Type 1, access-list transaction.
    Eip2930,
    /// Type 2, dynamic-fee transaction.
    Eip1559,
}

impl EvmTxKind {
    /// Returns the EIP-2718 type byte, `None` for legacy.
    #[must_use]
    pub const fn type_byte(&self) -> Option<u8> {
        match self {
            Self::Legacy => None,
            Self::Eip2930 => Some(0x01),
            Self::Eip1559 => Some(0x02),
        }
    }

    /// Returns the kind name as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Eip2930 => "eip2930",
            Self::Eip1559 => "eip1559",
        }
    }
}

impl fmt::Display for EvmTxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An EIP-2930 access list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Accessed contract.
    pub address: Address,
    /// Accessed storage slots.
    #[serde(default)]
    pub storage_keys: Vec<B256>,
}

/// An EVM transaction to be signed.
///
/// Fee fields are validated against `kind` by the encoder, not at
/// deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
    /// Envelope kind.
    pub kind: EvmTxKind,
    /// Recipient, `None` for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    /// Value in wei.
    #[serde(default)]
    pub value: U256,
    /// Call data.
    #[serde(default)]
    pub data: Bytes,
    /// Gas limit. Estimated by the resolver when zero.
    #[serde(default)]
    pub gas_limit: u64,
    /// Account nonce. Filled by the resolver.
    #[serde(default)]
    pub nonce: u64,
    /// EIP-155 chain id.
    pub chain_numeric_id: u64,
    /// Access list. Required (possibly empty) for EIP-2930.
    #[serde(default)]
    pub access_list: Option<Vec<AccessListItem>>,
    /// EIP-1559 priority fee in wei.
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
    /// EIP-1559 fee cap in wei.
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    /// Legacy and EIP-2930 gas price in wei.
    #[serde(default)]
    pub gas_price: Option<u128>,
}

/// A legacy amino message: `{"type": ..., "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoMsg {
    /// Amino type name, e.g. `cosmos-sdk/MsgSend`.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Amino JSON value.
    pub value: Value,
}

/// An amino-JSON Cosmos transaction signed as EIP-712 typed data, the
/// Ethermint legacy signing mode.
///
/// The amino `StdSignDoc` built from the transaction fields becomes the
/// typed-data `message`; `types` must declare its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712CosmosTx {
    /// Domain values.
    pub domain: TypedDataDomain,
    /// Struct type declarations. May include `EIP712Domain`.
    pub types: BTreeMap<String, Vec<TypedDataField>>,
    /// Name of the type of the sign doc.
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    /// Amino messages in execution order.
    pub msgs: Vec<AminoMsg>,
    /// Free-form memo.
    #[serde(default)]
    pub memo: String,
    /// Fee.
    pub fee: CosmosFee,
    /// On-chain account number. Filled by the resolver.
    #[serde(default)]
    pub account_number: u64,
    /// Account sequence. Filled by the resolver.
    #[serde(default)]
    pub sequence: u64,
}

/// A single field of an EIP-712 struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    /// Field name.
    pub name: String,
    /// Solidity type, e.g. `address`, `uint256`, `Person[]`.
    #[serde(rename = "type")]
    pub r#type: String,
}

impl TypedDataField {
    /// Creates a new field.
    #[must_use]
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
        }
    }
}

/// The EIP-712 domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    /// Signing domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Signing domain version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// EIP-155 chain id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Verifying contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    /// Disambiguating salt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

/// An EIP-712 typed-data document in its standard JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Domain values.
    pub domain: TypedDataDomain,
    /// Struct type declarations. May include `EIP712Domain`.
    pub types: BTreeMap<String, Vec<TypedDataField>>,
    /// Name of the type of `message`.
    pub primary_type: String,
    /// The message to sign.
    pub message: Value,
}

/// What the caller wants signed. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnsignedIntent {
    /// A Cosmos SDK transaction signed in direct mode.
    DirectCosmosTx(DirectCosmosTx),
    /// An EVM transaction.
    EvmTransaction(EvmTransaction),
    /// An EIP-712 typed-data document.
    TypedData(TypedData),
    /// Opaque bytes signed for identity proof.
    ArbitraryBytes {
        /// Bytes to sign.
        #[serde(with = "hex_vec")]
        payload: Vec<u8>,
    },
    /// An amino Cosmos transaction wrapped in EIP-712 typed data.
    Eip712CosmosTx(Eip712CosmosTx),
    /// An EIP-191 personal message.
    EthereumMessage {
        /// Message bytes, without the EIP-191 prefix.
        #[serde(with = "hex_vec")]
        payload: Vec<u8>,
    },
}

impl UnsignedIntent {
    /// Returns the variant name, used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DirectCosmosTx(_) => "direct_cosmos_tx",
            Self::EvmTransaction(_) => "evm_transaction",
            Self::TypedData(_) => "typed_data",
            Self::Eip712CosmosTx(_) => "eip712_cosmos_tx",
            Self::ArbitraryBytes { .. } => "arbitrary_bytes",
            Self::EthereumMessage { .. } => "ethereum_message",
        }
    }

    /// Returns `true` if this intent produces a transaction to broadcast.
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::DirectCosmosTx(_) | Self::EvmTransaction(_))
    }

    /// The account sequence (Cosmos) or nonce (EVM) of a transaction intent.
    pub fn sequence_mut(&mut self) -> Option<&mut u64> {
        match self {
            Self::DirectCosmosTx(tx) => Some(&mut tx.sequence),
            Self::EvmTransaction(tx) => Some(&mut tx.nonce),
            _ => None,
        }
    }
}

// ============================================================================
// Signing results
// ============================================================================

/// How an EVM-family payload should be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EthSignType {
    /// An RLP transaction envelope.
    Transaction,
    /// An EIP-712 typed-data document (JSON).
    Eip712,
    /// An EIP-191 personal message.
    Message,
}

/// Body and auth-info bytes echoed back by the signer after direct signing.
///
/// The signer may have adjusted fees or memo; these bytes are what was
/// actually signed and take precedence over the locally encoded ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Encoded `TxBody`.
    #[serde(with = "hex_vec")]
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    #[serde(with = "hex_vec")]
    pub auth_info_bytes: Vec<u8>,
}

/// What the external signer returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedResult {
    /// Raw signature bytes, or a full signed envelope for EVM transactions.
    #[serde(with = "hex_vec")]
    pub signature: Vec<u8>,
    /// Signer public key, when reported.
    #[serde(default, with = "hex_opt_vec", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Vec<u8>>,
    /// Echoed Cosmos payload for direct signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_payload: Option<SignedPayload>,
}

/// Result of checking a signature against an expected identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the recovered identity equals the expected one.
    pub matched: bool,
    /// The identity recovered from the signature.
    pub recovered_identity: String,
}

/// Broadcast semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Return after the mempool accepted the transaction.
    #[default]
    Sync,
    /// Return immediately.
    Async,
    /// Wait for inclusion in a block.
    Block,
}

impl BroadcastMode {
    /// Returns the Cosmos REST `mode` value.
    #[must_use]
    pub const fn cosmos_mode(&self) -> &'static str {
        match self {
            Self::Sync => "BROADCAST_MODE_SYNC",
            Self::Async => "BROADCAST_MODE_ASYNC",
            Self::Block => "BROADCAST_MODE_BLOCK",
        }
    }
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync => "sync",
            Self::Async => "async",
            Self::Block => "block",
        })
    }
}

/// Cosmos account state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// On-chain account number.
    pub account_number: u64,
    /// Next sequence.
    pub sequence: u64,
}

/// Current EVM fee market data, all values in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeData {
    /// Legacy gas price.
    pub gas_price: Option<u128>,
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 priority fee.
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Serde helper for `0x`-prefixed hex byte vectors.
pub mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as `0x`-prefixed lowercase hex.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserialize hex, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

mod hex_opt_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => super::hex_vec::serialize(b, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            hex::decode(s).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
