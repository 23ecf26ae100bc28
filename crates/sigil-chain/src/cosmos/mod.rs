//! Cosmos SDK direct signing.
//!
//! A direct-sign payload is two independently encoded protobuf blocks,
//! `TxBody` and `AuthInfo`, bound to a chain and account by `SignDoc`. The
//! signature covers `SHA256(SignDoc)`; the broadcast envelope is `TxRaw`.
//!
//! # Example
//!
//! ```
//! use sigil_chain::cosmos::{self, DirectPayload};
//! use sigil_core::types::{Coin, CosmosFee, DirectCosmosTx};
//!
//! let msg = cosmos::msg_send("osmo1from", "osmo1to", &[Coin::new("uosmo", "1")]);
//! let tx = DirectCosmosTx {
//!     messages: vec![msg],
//!     memo: String::new(),
//!     timeout_height: 0,
//!     fee: CosmosFee { amount: vec![], gas_limit: 200_000, ..Default::default() },
//!     account_number: 1,
//!     sequence: 0,
//! };
//!
//! let pubkey = [2u8; 33];
//! let payload: DirectPayload = cosmos::encode_direct("osmosis-1", &tx, &pubkey).expect("encode");
//! assert_eq!(payload.account_number, 1);
//! assert_eq!(payload.sign_doc_digest().len(), 32);
//! ```

pub mod adr36;
pub mod eip712;
pub mod proto;

use prost::Message;
use sigil_core::error::{EncodeError, EncodeResult};
use sigil_core::types::{AnyMessage, Coin, CosmosFee, DirectCosmosTx};
use sigil_crypto::verify::sha256;

use proto::{AuthInfo, Fee, ModeInfo, PubKey, SignDoc, SignMode, SignerInfo, TxBody, TxRaw};

/// Type URL of a secp256k1 public key.
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// Type URL of a bank send message.
pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";

/// Unsigned direct-sign payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectPayload {
    /// Encoded `TxBody`.
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    pub auth_info_bytes: Vec<u8>,
    /// Chain id bound into the sign doc.
    pub chain_id: String,
    /// Account number bound into the sign doc.
    pub account_number: u64,
}

impl DirectPayload {
    /// Encoded `SignDoc`.
    #[must_use]
    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        encode_sign_doc(
            &self.body_bytes,
            &self.auth_info_bytes,
            &self.chain_id,
            self.account_number,
        )
    }

    /// `SHA256(SignDoc)`, the digest the signer signs.
    #[must_use]
    pub fn sign_doc_digest(&self) -> [u8; 32] {
        sha256(&self.sign_doc_bytes())
    }
}

/// Encodes a direct-sign payload for `tx` on `chain_id`.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidField`] if there are no messages, a coin
/// amount is not a decimal integer, or `public_key` is not 33 bytes.
pub fn encode_direct(
    chain_id: &str,
    tx: &DirectCosmosTx,
    public_key: &[u8],
) -> EncodeResult<DirectPayload> {
    validate(tx, public_key)?;

    Ok(DirectPayload {
        body_bytes: encode_body(tx),
        auth_info_bytes: encode_auth_info(&tx.fee, tx.sequence, public_key),
        chain_id: chain_id.to_string(),
        account_number: tx.account_number,
    })
}

fn validate(tx: &DirectCosmosTx, public_key: &[u8]) -> EncodeResult<()> {
    if tx.messages.is_empty() {
        return Err(EncodeError::invalid_field("messages", "at least one message is required"));
    }
    if let Some(msg) = tx.messages.iter().find(|m| m.type_url.is_empty()) {
        return Err(EncodeError::invalid_field(
            "messages.type_url",
            format!("empty type url for {}-byte message", msg.value.len()),
        ));
    }
    for coin in &tx.fee.amount {
        validate_coin(coin)?;
    }
    if public_key.len() != 33 {
        return Err(EncodeError::invalid_field(
            "public_key",
            format!("expected 33-byte compressed key, got {} bytes", public_key.len()),
        ));
    }
    Ok(())
}

fn validate_coin(coin: &Coin) -> EncodeResult<()> {
    if coin.denom.is_empty() {
        return Err(EncodeError::invalid_field("fee.amount.denom", "empty denom"));
    }
    if coin.amount.is_empty() || !coin.amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodeError::invalid_field(
            "fee.amount.amount",
            format!("'{}' is not a decimal integer", coin.amount),
        ));
    }
    Ok(())
}

/// Encodes `TxBody{messages, memo, timeout_height}`.
#[must_use]
pub fn encode_body(tx: &DirectCosmosTx) -> Vec<u8> {
    TxBody {
        messages: tx.messages.iter().map(to_any).collect(),
        memo: tx.memo.clone(),
        timeout_height: tx.timeout_height,
    }
    .encode_to_vec()
}

/// Encodes `AuthInfo` for a single direct-mode signer.
#[must_use]
pub fn encode_auth_info(fee: &CosmosFee, sequence: u64, public_key: &[u8]) -> Vec<u8> {
    let signer = SignerInfo {
        public_key: Some(proto::Any {
            type_url: SECP256K1_PUBKEY_TYPE_URL.to_string(),
            value: PubKey {
                key: public_key.to_vec(),
            }
            .encode_to_vec(),
        }),
        mode_info: Some(ModeInfo::single(SignMode::Direct)),
        sequence,
    };

    AuthInfo {
        signer_infos: vec![signer],
        fee: Some(Fee {
            amount: fee.amount.iter().map(to_proto_coin).collect(),
            gas_limit: fee.gas_limit,
            payer: fee.payer.clone(),
            granter: fee.granter.clone(),
        }),
    }
    .encode_to_vec()
}

/// Encodes `SignDoc{body_bytes, auth_info_bytes, chain_id, account_number}`.
#[must_use]
pub fn encode_sign_doc(
    body_bytes: &[u8],
    auth_info_bytes: &[u8],
    chain_id: &str,
    account_number: u64,
) -> Vec<u8> {
    SignDoc {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.to_vec(),
        chain_id: chain_id.to_string(),
        account_number,
    }
    .encode_to_vec()
}

/// Encodes the broadcast envelope.
#[must_use]
pub fn assemble_tx_raw(body_bytes: &[u8], auth_info_bytes: &[u8], signature: &[u8]) -> Vec<u8> {
    TxRaw {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.to_vec(),
        signatures: vec![signature.to_vec()],
    }
    .encode_to_vec()
}

/// Decodes a `TxRaw` envelope.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if `bytes` is not a valid `TxRaw`.
pub fn decode_tx_raw(bytes: &[u8]) -> EncodeResult<TxRaw> {
    TxRaw::decode(bytes).map_err(|e| EncodeError::malformed_envelope(format!("invalid TxRaw: {e}")))
}

/// Decodes an `AuthInfo` block.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if `bytes` is not a valid `AuthInfo`.
pub fn decode_auth_info(bytes: &[u8]) -> EncodeResult<AuthInfo> {
    AuthInfo::decode(bytes)
        .map_err(|e| EncodeError::malformed_envelope(format!("invalid AuthInfo: {e}")))
}

/// Transaction hash: uppercase hex `SHA256(TxRaw)`, as reported by nodes.
#[must_use]
pub fn tx_hash(tx_raw: &[u8]) -> String {
    hex::encode_upper(sha256(tx_raw))
}

/// Builds a `/cosmos.bank.v1beta1.MsgSend`.
#[must_use]
pub fn msg_send(from_address: &str, to_address: &str, amount: &[Coin]) -> AnyMessage {
    AnyMessage {
        type_url: MSG_SEND_TYPE_URL.to_string(),
        value: proto::MsgSend {
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount: amount.iter().map(to_proto_coin).collect(),
        }
        .encode_to_vec(),
    }
}

fn to_any(message: &AnyMessage) -> proto::Any {
    proto::Any {
        type_url: message.type_url.clone(),
        value: message.value.clone(),
    }
}

fn to_proto_coin(coin: &Coin) -> proto::Coin {
    proto::Coin {
        denom: coin.denom.clone(),
        amount: coin.amount.clone(),
    }
}
