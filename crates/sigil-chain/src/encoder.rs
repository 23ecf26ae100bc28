//! Payload encoder: turns an [`UnsignedIntent`] into the exact bytes (or
//! document) handed to the external signer.
//!
//! | Intent             | Family          | Output                                   |
//! |--------------------|-----------------|------------------------------------------|
//! | `DirectCosmosTx`   | Cosmos SDK      | `TxBody` + `AuthInfo` + `SignDoc` inputs |
//! | `EvmTransaction`   | EVM-compatible  | unsigned RLP envelope + signing hash     |
//! | `TypedData`        | EVM-compatible  | validated EIP-712 JSON document          |
//! | `Eip712CosmosTx`   | EVM-compatible  | EIP-712 document over an amino sign doc  |
//! | `EthereumMessage`  | EVM-compatible  | message + EIP-191 digest                 |
//! | `ArbitraryBytes`   | both            | ADR-036 sign doc + family digest         |
//!
//! Encoding is pure and deterministic: identical inputs give byte-identical
//! output.

use alloy_primitives::B256;
use sigil_core::error::{EncodeError, EncodeResult};
use sigil_core::types::{
    ChainDescriptor, ChainFamily, EthSignType, EvmTransaction, SignerIdentity, TypedData,
    UnsignedIntent,
};

use crate::cosmos::{self, adr36, DirectPayload};
use crate::{evm, typed_data};

/// Output of [`PayloadEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPayload {
    /// Cosmos direct-sign payload.
    CosmosDirect(DirectPayload),

    /// Unsigned EVM envelope.
    EvmTransaction {
        /// Unsigned envelope (typed transactions include the type byte).
        unsigned: Vec<u8>,
        /// `keccak256(unsigned)`.
        signing_hash: B256,
    },

    /// Validated EIP-712 document.
    TypedData {
        /// Canonical JSON handed to the signer.
        json: Vec<u8>,
        /// The parsed document, kept for verification.
        document: Box<TypedData>,
    },

    /// EIP-191 personal message.
    PersonalMessage {
        /// Message bytes without the prefix.
        message: Vec<u8>,
        /// EIP-191 digest.
        digest: [u8; 32],
    },

    /// ADR-036 arbitrary-data document.
    Adr36 {
        /// Bech32 signer address bound into the document.
        signer: String,
        /// The raw data.
        data: Vec<u8>,
        /// Amino JSON sign bytes.
        sign_bytes: Vec<u8>,
        /// SHA-256 (Cosmos) or Keccak-256 (EVM) of `sign_bytes`.
        digest: [u8; 32],
    },
}

impl EncodedPayload {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CosmosDirect(_) => "cosmos_direct",
            Self::EvmTransaction { .. } => "evm_transaction",
            Self::TypedData { .. } => "typed_data",
            Self::PersonalMessage { .. } => "personal_message",
            Self::Adr36 { .. } => "adr36",
        }
    }

    /// How the payload is passed to `sign_ethereum`, if it is.
    #[must_use]
    pub const fn eth_sign_type(&self) -> Option<EthSignType> {
        match self {
            Self::EvmTransaction { .. } => Some(EthSignType::Transaction),
            Self::TypedData { .. } => Some(EthSignType::Eip712),
            Self::PersonalMessage { .. } => Some(EthSignType::Message),
            Self::CosmosDirect(_) | Self::Adr36 { .. } => None,
        }
    }

    /// Bytes handed to the signer.
    #[must_use]
    pub fn signer_bytes(&self) -> Vec<u8> {
        match self {
            Self::CosmosDirect(payload) => payload.sign_doc_bytes(),
            Self::EvmTransaction { unsigned, .. } => unsigned.clone(),
            Self::TypedData { json, .. } => json.clone(),
            Self::PersonalMessage { message, .. } => message.clone(),
            Self::Adr36 { sign_bytes, .. } => sign_bytes.clone(),
        }
    }

    /// The 32-byte digest a signature over this payload commits to.
    ///
    /// # Errors
    ///
    /// Only typed data can fail here, when a value does not fit its type.
    pub fn digest(&self) -> EncodeResult<[u8; 32]> {
        match self {
            Self::CosmosDirect(payload) => Ok(payload.sign_doc_digest()),
            Self::EvmTransaction { signing_hash, .. } => Ok(signing_hash.0),
            Self::TypedData { document, .. } => typed_data::signing_hash(document).map(|h| h.0),
            Self::PersonalMessage { digest, .. } | Self::Adr36 { digest, .. } => Ok(*digest),
        }
    }
}

/// Stateless intent encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadEncoder;

impl PayloadEncoder {
    /// Creates an encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encodes `intent` for `chain` on behalf of `identity`.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::FamilyMismatch`] if the intent does not belong to the
    ///   chain's family
    /// - [`EncodeError::InvalidField`] for an EVM transaction whose chain id
    ///   differs from the chain's EVM chain id
    /// - the per-family validation errors of [`cosmos`], [`evm`] and
    ///   [`typed_data`]
    pub fn encode(
        &self,
        chain: &ChainDescriptor,
        identity: &SignerIdentity,
        intent: &UnsignedIntent,
    ) -> EncodeResult<EncodedPayload> {
        match intent {
            UnsignedIntent::DirectCosmosTx(tx) => {
                require_family(chain, ChainFamily::CosmosSdk, intent)?;
                cosmos::encode_direct(&chain.chain_id, tx, &identity.public_key)
                    .map(EncodedPayload::CosmosDirect)
            }
            UnsignedIntent::EvmTransaction(tx) => {
                require_family(chain, ChainFamily::EvmCompatible, intent)?;
                check_evm_chain_id(chain, tx)?;
                let unsigned = evm::encode_unsigned(tx)?;
                let signing_hash = evm::signing_hash(tx)?;
                Ok(EncodedPayload::EvmTransaction {
                    unsigned,
                    signing_hash,
                })
            }
            UnsignedIntent::TypedData(document) => {
                require_family(chain, ChainFamily::EvmCompatible, intent)?;
                typed_data::validate(document)?;
                let json = serde_json::to_vec(document)
                    .map_err(|e| EncodeError::invalid_field("typed_data", e.to_string()))?;
                Ok(EncodedPayload::TypedData {
                    json,
                    document: Box::new(document.clone()),
                })
            }
            UnsignedIntent::Eip712CosmosTx(tx) => {
                require_family(chain, ChainFamily::EvmCompatible, intent)?;
                let document = cosmos::eip712::typed_data(&chain.chain_id, tx)?;
                let json = serde_json::to_vec(&document)
                    .map_err(|e| EncodeError::invalid_field("typed_data", e.to_string()))?;
                Ok(EncodedPayload::TypedData {
                    json,
                    document: Box::new(document),
                })
            }
            UnsignedIntent::EthereumMessage { payload } => {
                require_family(chain, ChainFamily::EvmCompatible, intent)?;
                Ok(EncodedPayload::PersonalMessage {
                    message: payload.clone(),
                    digest: evm::personal_message_hash(payload),
                })
            }
            UnsignedIntent::ArbitraryBytes { payload } => {
                let signer = identity.textual_address.clone();
                let sign_bytes = adr36::sign_bytes(&signer, payload)?;
                let digest = adr36::digest_algorithm(chain.family).hash(&sign_bytes);
                Ok(EncodedPayload::Adr36 {
                    signer,
                    data: payload.clone(),
                    sign_bytes,
                    digest,
                })
            }
        }
    }
}

fn require_family(
    chain: &ChainDescriptor,
    family: ChainFamily,
    intent: &UnsignedIntent,
) -> EncodeResult<()> {
    if chain.family == family {
        Ok(())
    } else {
        Err(EncodeError::family_mismatch(
            &chain.chain_id,
            chain.family.as_str(),
            intent.name(),
        ))
    }
}

fn check_evm_chain_id(chain: &ChainDescriptor, tx: &EvmTransaction) -> EncodeResult<()> {
    match chain.evm_chain_id {
        Some(id) if id != tx.chain_numeric_id => Err(EncodeError::invalid_field(
            "chain_numeric_id",
            format!(
                "{} does not match chain {} (EVM chain id {id})",
                tx.chain_numeric_id, chain.chain_id
            ),
        )),
        _ => Ok(()),
    }
}
