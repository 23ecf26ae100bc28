//! ADR-036 off-chain signing of arbitrary data.
//!
//! The signed document is an amino-JSON `StdSignDoc` carrying a single
//! `sign/MsgSignData` message, with an empty fee, empty chain id and zero
//! account number and sequence. Keys are emitted in sorted order, and `<`,
//! `>` and `&` are escaped as in amino JSON.
//!
//! Cosmos SDK chains hash the document with SHA-256; Ethermint chains use
//! Keccak-256 and an `ethsecp256k1` public key type.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sigil_core::error::{EncodeError, EncodeResult, RecoveryError};
use sigil_core::types::ChainFamily;
use sigil_crypto::verify::DigestAlgorithm;

/// Amino type of the signed message.
pub const MSG_SIGN_DATA_TYPE: &str = "sign/MsgSignData";

/// Amino type of a Cosmos secp256k1 public key.
pub const SECP256K1_PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// Amino type of an Ethermint secp256k1 public key.
pub const ETH_SECP256K1_PUBKEY_TYPE: &str = "ethermint/PubKeyEthSecp256k1";

// Field declaration order is the sorted key order of the serialized form.

/// Amino `StdSignDoc`.
///
/// For ADR-036 the message type is [`MsgSignData`] and every other field is
/// fixed; [`eip712`](super::eip712) fills it from a real transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc<M = MsgSignData> {
    /// Decimal account number; `"0"` for ADR-036.
    pub account_number: String,
    /// Chain id; empty for ADR-036.
    pub chain_id: String,
    /// Fee; empty for ADR-036.
    pub fee: StdFee,
    /// Memo; empty for ADR-036.
    pub memo: String,
    /// Messages; exactly one `sign/MsgSignData` for ADR-036.
    pub msgs: Vec<M>,
    /// Decimal sequence; `"0"` for ADR-036.
    pub sequence: String,
}

/// Amino `StdFee`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    /// Fee coins.
    pub amount: Vec<serde_json::Value>,
    /// Gas limit as a decimal string.
    pub gas: String,
    /// Fee granter, omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
    /// Fee payer, omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// `{"type": "sign/MsgSignData", "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSignData {
    /// Amino type.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Message value.
    pub value: MsgSignDataValue,
}

/// Value of [`MsgSignData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSignDataValue {
    /// Base64 of the signed bytes.
    pub data: String,
    /// Bech32 signer address.
    pub signer: String,
}

impl StdSignDoc {
    /// Builds the document for `signer` over `data`.
    #[must_use]
    pub fn new(signer: &str, data: &[u8]) -> Self {
        Self {
            account_number: "0".to_string(),
            chain_id: String::new(),
            fee: StdFee {
                gas: "0".to_string(),
                ..StdFee::default()
            },
            memo: String::new(),
            msgs: vec![MsgSignData {
                msg_type: MSG_SIGN_DATA_TYPE.to_string(),
                value: MsgSignDataValue {
                    data: STANDARD.encode(data),
                    signer: signer.to_string(),
                },
            }],
            sequence: "0".to_string(),
        }
    }
}

impl<M: Serialize> StdSignDoc<M> {
    /// Sorted, escaped amino JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidField`] if serialization fails.
    pub fn to_sign_bytes(&self) -> EncodeResult<Vec<u8>> {
        let json = serde_json::to_string(self)
            .map_err(|e| EncodeError::invalid_field("sign_doc", e.to_string()))?;
        Ok(escape_amino_json(&json).into_bytes())
    }
}

/// Digest used for ADR-036 documents on `family`.
#[must_use]
pub const fn digest_algorithm(family: ChainFamily) -> DigestAlgorithm {
    match family {
        ChainFamily::CosmosSdk => DigestAlgorithm::Sha256,
        ChainFamily::EvmCompatible => DigestAlgorithm::Keccak256,
    }
}

/// Sign bytes of the ADR-036 document for `signer` over `data`.
///
/// # Errors
///
/// See [`StdSignDoc::to_sign_bytes`].
pub fn sign_bytes(signer: &str, data: &[u8]) -> EncodeResult<Vec<u8>> {
    StdSignDoc::new(signer, data).to_sign_bytes()
}

/// Digest the signer signs for `signer` over `data` on `family`.
///
/// # Errors
///
/// See [`StdSignDoc::to_sign_bytes`].
pub fn sign_doc_digest(family: ChainFamily, signer: &str, data: &[u8]) -> EncodeResult<[u8; 32]> {
    sign_bytes(signer, data).map(|bytes| digest_algorithm(family).hash(&bytes))
}

/// Amino public key: `{"type": ..., "value": base64}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdPubKey {
    /// Amino key type.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64 compressed key.
    pub value: String,
}

/// Amino `StdSignature` returned by `signArbitrary`-style signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    /// Signer public key.
    pub pub_key: StdPubKey,
    /// Base64 64-byte `r || s` signature.
    pub signature: String,
}

impl StdSignature {
    /// Wraps a compressed key and signature with the key type of `family`.
    #[must_use]
    pub fn new(family: ChainFamily, public_key: &[u8], signature: &[u8]) -> Self {
        let key_type = match family {
            ChainFamily::CosmosSdk => SECP256K1_PUBKEY_TYPE,
            ChainFamily::EvmCompatible => ETH_SECP256K1_PUBKEY_TYPE,
        };
        Self {
            pub_key: StdPubKey {
                key_type: key_type.to_string(),
                value: STANDARD.encode(public_key),
            },
            signature: STANDARD.encode(signature),
        }
    }

    /// Decoded public key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidDocument`] for invalid base64 or an
    /// unknown key type.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, RecoveryError> {
        if self.pub_key.key_type != SECP256K1_PUBKEY_TYPE
            && self.pub_key.key_type != ETH_SECP256K1_PUBKEY_TYPE
        {
            return Err(RecoveryError::invalid_document(format!(
                "unsupported public key type {}",
                self.pub_key.key_type
            )));
        }
        STANDARD
            .decode(&self.pub_key.value)
            .map_err(|e| RecoveryError::invalid_document(format!("public key: {e}")))
    }

    /// Decoded signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidDocument`] for invalid base64.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, RecoveryError> {
        STANDARD
            .decode(&self.signature)
            .map_err(|e| RecoveryError::invalid_document(format!("signature: {e}")))
    }
}

fn escape_amino_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            other => out.push(other),
        }
    }
    out
}
