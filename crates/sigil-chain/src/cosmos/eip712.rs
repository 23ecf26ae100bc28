//! Amino Cosmos transactions signed as EIP-712 typed data.
//!
//! Ethermint chains accept a legacy amino `StdSignDoc` whose JSON form is
//! used as the `message` of an EIP-712 document. The caller supplies the
//! domain and the type declarations; the sign doc is built here from the
//! transaction fields, so the signed message always matches what would be
//! broadcast.

use sigil_core::error::{EncodeError, EncodeResult};
use sigil_core::types::{AminoMsg, Eip712CosmosTx, TypedData};

use super::adr36::{StdFee, StdSignDoc};
use crate::typed_data;

/// The amino sign doc of `tx` on `chain_id`.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidField`] if a fee coin cannot be serialized.
pub fn sign_doc(chain_id: &str, tx: &Eip712CosmosTx) -> EncodeResult<StdSignDoc<AminoMsg>> {
    let amount = tx
        .fee
        .amount
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EncodeError::invalid_field("fee.amount", e.to_string()))?;

    Ok(StdSignDoc {
        account_number: tx.account_number.to_string(),
        chain_id: chain_id.to_string(),
        fee: StdFee {
            amount,
            gas: tx.fee.gas_limit.to_string(),
            granter: non_empty(&tx.fee.granter),
            payer: non_empty(&tx.fee.payer),
        },
        memo: tx.memo.clone(),
        msgs: tx.msgs.clone(),
        sequence: tx.sequence.to_string(),
    })
}

/// The validated EIP-712 document whose message is the sign doc of `tx`.
///
/// # Errors
///
/// - [`EncodeError::InvalidField`] if `tx` has no messages
/// - [`EncodeError::SchemaMismatch`] if `types` does not declare the sign
///   doc's shape
pub fn typed_data(chain_id: &str, tx: &Eip712CosmosTx) -> EncodeResult<TypedData> {
    if tx.msgs.is_empty() {
        return Err(EncodeError::invalid_field("msgs", "at least one message is required"));
    }
    let message = serde_json::to_value(sign_doc(chain_id, tx)?)
        .map_err(|e| EncodeError::invalid_field("sign_doc", e.to_string()))?;

    let document = TypedData {
        domain: tx.domain.clone(),
        types: tx.types.clone(),
        primary_type: tx.primary_type.clone(),
        message,
    };
    typed_data::validate(&document)?;
    Ok(document)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
