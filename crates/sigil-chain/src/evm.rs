//! EVM transaction envelopes.
//!
//! Unsigned signing payloads:
//!
//! | Kind     | Payload                                                                                   |
//! |----------|-------------------------------------------------------------------------------------------|
//! | Legacy   | `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])` (EIP-155)               |
//! | EIP-2930 | `0x01 \|\| rlp([chainId, nonce, gasPrice, gasLimit, to, value, data, accessList])`          |
//! | EIP-1559 | `0x02 \|\| rlp([chainId, nonce, maxPriorityFee, maxFee, gasLimit, to, value, data, accessList])` |
//!
//! The signing hash is `keccak256` of the unsigned payload. Signed envelopes
//! replace the EIP-155 trailer with `(v, r, s)` for legacy and append
//! `(yParity, r, s)` for typed transactions.
//!
//! # Example
//!
//! ```
//! use sigil_chain::evm;
//! use sigil_core::types::{EvmTransaction, EvmTxKind};
//!
//! let tx = EvmTransaction {
//!     kind: EvmTxKind::Legacy,
//!     to: Some("0x3535353535353535353535353535353535353535".parse().unwrap()),
//!     value: "1000000000000000000".parse().unwrap(),
//!     data: Default::default(),
//!     gas_limit: 21_000,
//!     nonce: 9,
//!     chain_numeric_id: 1,
//!     access_list: None,
//!     max_priority_fee_per_gas: None,
//!     max_fee_per_gas: None,
//!     gas_price: Some(20_000_000_000),
//! };
//!
//! let unsigned = evm::encode_unsigned(&tx).expect("valid legacy tx");
//! assert!(unsigned[0] >= 0xc0);
//! ```

use alloy_primitives::{B256, U256};
use sigil_core::error::{EncodeError, EncodeResult};
use sigil_core::types::{AccessListItem, EvmTransaction, EvmTxKind};
use sigil_crypto::verify::{keccak256, normalize_recovery_byte};

use crate::rlp::{
    decode_bytes, decode_list, decode_optional_address, decode_u256, decode_u64, detect_tx_type,
    is_list, typed_tx_payload, ListEncoder,
};

/// EIP-191 prefix for `personal_sign` messages.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Checks that the fee fields required by `tx.kind` are present.
///
/// # Errors
///
/// - [`EncodeError::FeeFieldsMissing`] for an EIP-1559 transaction without
///   `max_fee_per_gas` or `max_priority_fee_per_gas`
/// - [`EncodeError::GasPriceMissing`] for legacy and EIP-2930 without `gas_price`
/// - [`EncodeError::AccessListMissing`] for EIP-2930 without an access list
/// - [`EncodeError::InvalidField`] if the priority fee exceeds the fee cap
pub fn validate(tx: &EvmTransaction) -> EncodeResult<()> {
    match tx.kind {
        EvmTxKind::Legacy => {
            if tx.gas_price.is_none() {
                return Err(EncodeError::gas_price_missing(tx.kind.as_str()));
            }
        }
        EvmTxKind::Eip2930 => {
            if tx.access_list.is_none() {
                return Err(EncodeError::AccessListMissing);
            }
            if tx.gas_price.is_none() {
                return Err(EncodeError::gas_price_missing(tx.kind.as_str()));
            }
        }
        EvmTxKind::Eip1559 => {
            let max_fee = tx
                .max_fee_per_gas
                .ok_or_else(|| EncodeError::fee_fields_missing("max_fee_per_gas"))?;
            let priority = tx
                .max_priority_fee_per_gas
                .ok_or_else(|| EncodeError::fee_fields_missing("max_priority_fee_per_gas"))?;
            if priority > max_fee {
                return Err(EncodeError::invalid_field(
                    "max_priority_fee_per_gas",
                    format!("{priority} exceeds max_fee_per_gas {max_fee}"),
                ));
            }
        }
    }
    Ok(())
}

/// Encodes the unsigned signing payload.
///
/// # Errors
///
/// See [`validate`].
pub fn encode_unsigned(tx: &EvmTransaction) -> EncodeResult<Vec<u8>> {
    validate(tx)?;

    let mut list = ListEncoder::new();
    push_body(&mut list, tx)?;
    if tx.kind == EvmTxKind::Legacy {
        list.push(&tx.chain_numeric_id).push(&0u8).push(&0u8);
    }

    Ok(with_type_byte(tx.kind, list.finish()))
}

/// `keccak256` of the unsigned payload.
///
/// # Errors
///
/// See [`validate`].
pub fn signing_hash(tx: &EvmTransaction) -> EncodeResult<B256> {
    encode_unsigned(tx).map(|unsigned| B256::from(keccak256(&unsigned)))
}

/// Builds the signed envelope from a 65-byte `r || s || v` signature.
///
/// `v` may be a raw recovery id or the 27/28 form.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidField`] for a malformed signature, plus
/// everything [`validate`] can return.
pub fn assemble_signed(tx: &EvmTransaction, signature: &[u8]) -> EncodeResult<Vec<u8>> {
    validate(tx)?;

    let [rs @ .., v] = signature else {
        return Err(EncodeError::invalid_field("signature", "empty"));
    };
    if rs.len() != 64 {
        return Err(EncodeError::invalid_field(
            "signature",
            format!("expected 65 bytes, got {}", signature.len()),
        ));
    }
    let recovery_id =
        normalize_recovery_byte(*v).map_err(|e| EncodeError::invalid_field("signature", e.to_string()))?;
    let r = U256::from_be_slice(&rs[..32]);
    let s = U256::from_be_slice(&rs[32..]);

    let mut list = ListEncoder::new();
    push_body(&mut list, tx)?;
    match tx.kind {
        EvmTxKind::Legacy => {
            let v = tx
                .chain_numeric_id
                .checked_mul(2)
                .and_then(|c| c.checked_add(35 + u64::from(recovery_id)))
                .ok_or_else(|| EncodeError::invalid_field("chain_numeric_id", "too large"))?;
            list.push(&v);
        }
        EvmTxKind::Eip2930 | EvmTxKind::Eip1559 => {
            list.push(&recovery_id);
        }
    }
    list.push(&r).push(&s);

    Ok(with_type_byte(tx.kind, list.finish()))
}

/// Keccak-256 of a signed envelope, i.e. the transaction hash.
#[must_use]
pub fn tx_hash(signed_envelope: &[u8]) -> B256 {
    B256::from(keccak256(signed_envelope))
}

/// What [`inspect_signed`] found in a signed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSummary {
    /// Envelope kind.
    pub kind: EvmTxKind,
    /// Account nonce.
    pub nonce: u64,
    /// Transaction hash.
    pub hash: B256,
}

/// Checks that a signed envelope returned by a signer has the requested type,
/// nonce, recipient, value and call data before it is broadcast as-is.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if the envelope does not decode,
/// has the wrong type or item count, or any checked field differs from `tx`.
pub fn inspect_signed(tx: &EvmTransaction, envelope: &[u8]) -> EncodeResult<EnvelopeSummary> {
    let kind = match detect_tx_type(envelope) {
        None if is_list(envelope) => EvmTxKind::Legacy,
        Some(0x01) => EvmTxKind::Eip2930,
        Some(0x02) => EvmTxKind::Eip1559,
        Some(other) => {
            return Err(EncodeError::malformed_envelope(format!(
                "unsupported transaction type 0x{other:02x}"
            )))
        }
        None => return Err(EncodeError::malformed_envelope("not an RLP list")),
    };

    if kind != tx.kind {
        return Err(EncodeError::malformed_envelope(format!(
            "expected {} envelope, got {kind}",
            tx.kind
        )));
    }

    let items = decode_list(typed_tx_payload(envelope)?)?;
    let (expected_items, nonce_index, to_index) = match kind {
        EvmTxKind::Legacy => (9, 0, 3),
        EvmTxKind::Eip2930 => (11, 1, 4),
        EvmTxKind::Eip1559 => (12, 1, 5),
    };
    if items.len() != expected_items {
        return Err(EncodeError::malformed_envelope(format!(
            "{kind} envelope expected {expected_items} items, got {}",
            items.len()
        )));
    }
    let item = |index: usize, name: &str| {
        items
            .get(index)
            .copied()
            .ok_or_else(|| EncodeError::malformed_envelope(format!("missing {name}")))
    };

    let nonce = decode_u64(item(nonce_index, "nonce")?)?;
    if nonce != tx.nonce {
        return Err(EncodeError::malformed_envelope(format!(
            "nonce {nonce} does not match requested nonce {}",
            tx.nonce
        )));
    }
    if decode_optional_address(item(to_index, "recipient")?)? != tx.to {
        return Err(EncodeError::malformed_envelope("recipient does not match request"));
    }
    if decode_u256(item(to_index + 1, "value")?)? != tx.value {
        return Err(EncodeError::malformed_envelope("value does not match request"));
    }
    if decode_bytes(item(to_index + 2, "data")?)? != tx.data.as_ref() {
        return Err(EncodeError::malformed_envelope("call data does not match request"));
    }

    Ok(EnvelopeSummary {
        kind,
        nonce,
        hash: tx_hash(envelope),
    })
}

/// EIP-191 `personal_sign` digest:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
#[must_use]
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut prefixed =
        Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 20 + message.len());
    prefixed.extend_from_slice(PERSONAL_MESSAGE_PREFIX.as_bytes());
    prefixed.extend_from_slice(message.len().to_string().as_bytes());
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Pushes the fields shared by the unsigned and signed forms.
fn push_body(list: &mut ListEncoder, tx: &EvmTransaction) -> EncodeResult<()> {
    match tx.kind {
        EvmTxKind::Legacy => {
            list.push(&tx.nonce)
                .push(&required(tx.gas_price, "gas_price")?)
                .push(&tx.gas_limit);
        }
        EvmTxKind::Eip2930 => {
            list.push(&tx.chain_numeric_id)
                .push(&tx.nonce)
                .push(&required(tx.gas_price, "gas_price")?)
                .push(&tx.gas_limit);
        }
        EvmTxKind::Eip1559 => {
            list.push(&tx.chain_numeric_id)
                .push(&tx.nonce)
                .push(&required(tx.max_priority_fee_per_gas, "max_priority_fee_per_gas")?)
                .push(&required(tx.max_fee_per_gas, "max_fee_per_gas")?)
                .push(&tx.gas_limit);
        }
    }

    list.push_optional_address(tx.to.as_ref())
        .push(&tx.value)
        .push_bytes(&tx.data);

    if tx.kind != EvmTxKind::Legacy {
        list.push_raw(&encode_access_list(tx.access_list.as_deref().unwrap_or_default()));
    }
    Ok(())
}

fn required(value: Option<u128>, field: &str) -> EncodeResult<u128> {
    value.ok_or_else(|| EncodeError::fee_fields_missing(field))
}

/// `rlp([[address, [storageKey, ...]], ...])`.
#[must_use]
pub fn encode_access_list(items: &[AccessListItem]) -> Vec<u8> {
    let mut list = ListEncoder::new();
    for item in items {
        let mut keys = ListEncoder::new();
        for key in &item.storage_keys {
            keys.push(key);
        }
        let mut entry = ListEncoder::new();
        entry.push(&item.address).push_raw(&keys.finish());
        list.push_raw(&entry.finish());
    }
    list.finish()
}

fn with_type_byte(kind: EvmTxKind, rlp: Vec<u8>) -> Vec<u8> {
    match kind.type_byte() {
        None => rlp,
        Some(ty) => {
            let mut out = Vec::with_capacity(rlp.len() + 1);
            out.push(ty);
            out.extend_from_slice(&rlp);
            out
        }
    }
}
