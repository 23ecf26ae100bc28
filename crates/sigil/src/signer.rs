//! The external signer seam.
//!
//! The core never holds key material: every signature comes from an
//! [`ExternalSigner`] (a hardware wallet, a browser extension bridge, a KMS).
//! [`LocalSigner`] is an in-memory implementation for development and tests.

use std::fmt;

use async_trait::async_trait;
use sigil_chain::cosmos::{self, adr36};
use sigil_chain::verifier::verify_std_signature;
use sigil_chain::{evm, typed_data, ChainRegistry, SignerIdentityExt, StdSignature};
use sigil_core::error::SignError;
use sigil_core::types::{ChainDescriptor, EthSignType, SignedPayload, SignerIdentity, TypedData};
use sigil_crypto::{sha256, Secp256k1KeyPair, SecretKey};

use crate::logging::redact_bytes;

/// Why a signer did not produce a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The user or device declined.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Anything else.
    #[error("signer failed: {0}")]
    Failed(String),
}

impl From<SignerError> for SignError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected(reason) => Self::rejected(reason),
            SignerError::Failed(context) => Self::failed(context),
        }
    }
}

/// Direct-mode sign document handed to the signer.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectSignDoc {
    /// Encoded `TxBody`.
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    pub auth_info_bytes: Vec<u8>,
    /// Chain id.
    pub chain_id: String,
    /// Account number.
    pub account_number: u64,
}

impl DirectSignDoc {
    /// Encoded `SignDoc`.
    #[must_use]
    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        cosmos::encode_sign_doc(
            &self.body_bytes,
            &self.auth_info_bytes,
            &self.chain_id,
            self.account_number,
        )
    }
}

impl From<&cosmos::DirectPayload> for DirectSignDoc {
    fn from(payload: &cosmos::DirectPayload) -> Self {
        Self {
            body_bytes: payload.body_bytes.clone(),
            auth_info_bytes: payload.auth_info_bytes.clone(),
            chain_id: payload.chain_id.clone(),
            account_number: payload.account_number,
        }
    }
}

impl fmt::Debug for DirectSignDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSignDoc")
            .field("body_len", &self.body_bytes.len())
            .field("auth_info_len", &self.auth_info_bytes.len())
            .field("chain_id", &self.chain_id)
            .field("account_number", &self.account_number)
            .finish()
    }
}

/// What a signer returns for a direct sign request.
///
/// `signed` holds the bytes that were actually signed. A signer may adjust
/// the fee or memo before signing, so these bytes take precedence over the
/// ones that were sent.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectSignResponse {
    /// Echoed body and auth-info bytes.
    pub signed: SignedPayload,
    /// 64-byte `r || s` signature over `SHA256(SignDoc)`.
    pub signature: Vec<u8>,
}

impl fmt::Debug for DirectSignResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSignResponse")
            .field("body_len", &self.signed.body_bytes.len())
            .field("auth_info_len", &self.signed.auth_info_bytes.len())
            .field("signature", &redact_bytes(&self.signature))
            .finish()
    }
}

/// A signing capability the core does not control.
///
/// Addresses are bech32 textual addresses. Implementations must be cheap to
/// share across tasks.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    /// Signs a Cosmos direct-mode sign document.
    async fn sign_direct(
        &self,
        chain_id: &str,
        signer_address: &str,
        doc: DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError>;

    /// Signs an EVM payload.
    ///
    /// For [`EthSignType::Transaction`] the payload is the unsigned envelope
    /// and the result is either a 65-byte `r || s || v` signature or a
    /// complete signed envelope. For typed data (JSON) and personal messages
    /// the result is a 65-byte signature.
    async fn sign_ethereum(
        &self,
        chain_id: &str,
        signer_address: &str,
        payload: &[u8],
        sign_type: EthSignType,
    ) -> Result<Vec<u8>, SignerError>;

    /// Signs arbitrary data as an ADR-036 document.
    async fn sign_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
    ) -> Result<StdSignature, SignerError>;

    /// Verifies an ADR-036 signature, as the signer sees it.
    async fn verify_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
        signature: &StdSignature,
    ) -> Result<bool, SignerError>;
}

/// In-memory signer over a single secp256k1 key.
///
/// WARNING: development and testing only. The key lives in process memory.
pub struct LocalSigner {
    keypair: Secp256k1KeyPair,
    registry: ChainRegistry,
}

impl LocalSigner {
    /// Wraps a key pair. `registry` resolves chain ids to address rules.
    #[must_use]
    pub const fn new(keypair: Secp256k1KeyPair, registry: ChainRegistry) -> Self {
        Self { keypair, registry }
    }

    /// Parses a hex secret key, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] for malformed key material.
    pub fn from_hex(secret_hex: &str, registry: ChainRegistry) -> Result<Self, SignError> {
        let secret = SecretKey::from_hex(secret_hex)?;
        Ok(Self::new(Secp256k1KeyPair::from_secret_key(&secret)?, registry))
    }

    /// Generates a random key.
    #[must_use]
    pub fn generate(registry: ChainRegistry) -> Self {
        Self::new(Secp256k1KeyPair::generate(), registry)
    }

    /// 33-byte compressed public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8; 33] {
        self.keypair.public_key().compressed()
    }

    /// This key's identity on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::SignerFailed`] if the chain's prefix is invalid.
    pub fn identity(&self, chain: &ChainDescriptor) -> Result<SignerIdentity, SignError> {
        SignerIdentity::from_public_key(chain, self.public_key())
            .map_err(|e| SignError::failed(e.to_string()))
    }

    fn chain(&self, chain_id: &str) -> Result<&ChainDescriptor, SignerError> {
        self.registry
            .get(chain_id)
            .ok_or_else(|| SignerError::Failed(format!("unknown chain {chain_id}")))
    }

    /// Refuses to sign for an address that is not ours.
    fn check_address(&self, chain: &ChainDescriptor, address: &str) -> Result<(), SignerError> {
        let identity = self
            .identity(chain)
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        if identity.textual_address == address
            || identity.raw_hex_address.eq_ignore_ascii_case(address)
        {
            Ok(())
        } else {
            Err(SignerError::Failed(format!(
                "{address} is not managed by this signer"
            )))
        }
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<sigil_crypto::Secp256k1Signature, SignerError> {
        self.keypair
            .sign(digest)
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExternalSigner for LocalSigner {
    async fn sign_direct(
        &self,
        chain_id: &str,
        signer_address: &str,
        doc: DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        let chain = self.chain(chain_id)?;
        self.check_address(chain, signer_address)?;
        if doc.chain_id != chain_id {
            return Err(SignerError::Failed(format!(
                "sign doc is for {}, requested {chain_id}",
                doc.chain_id
            )));
        }

        let signature = self.sign_digest(&sha256(&doc.sign_doc_bytes()))?;
        Ok(DirectSignResponse {
            signed: SignedPayload {
                body_bytes: doc.body_bytes,
                auth_info_bytes: doc.auth_info_bytes,
            },
            signature: signature.as_ref().to_vec(),
        })
    }

    async fn sign_ethereum(
        &self,
        chain_id: &str,
        signer_address: &str,
        payload: &[u8],
        sign_type: EthSignType,
    ) -> Result<Vec<u8>, SignerError> {
        let chain = self.chain(chain_id)?;
        self.check_address(chain, signer_address)?;
        if !chain.family.is_evm() {
            return Err(SignerError::Failed(format!(
                "{chain_id} does not support Ethereum signing"
            )));
        }

        let digest = match sign_type {
            EthSignType::Transaction => sigil_crypto::keccak256(payload),
            EthSignType::Message => evm::personal_message_hash(payload),
            EthSignType::Eip712 => {
                let document: TypedData = serde_json::from_slice(payload)
                    .map_err(|e| SignerError::Failed(format!("invalid typed data: {e}")))?;
                typed_data::signing_hash(&document)
                    .map_err(|e| SignerError::Failed(e.to_string()))?
                    .0
            }
        };

        let signature = self.sign_digest(&digest)?;
        Ok(signature.to_eth_bytes().to_vec())
    }

    async fn sign_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
    ) -> Result<StdSignature, SignerError> {
        let chain = self.chain(chain_id)?;
        self.check_address(chain, signer_address)?;

        let digest = adr36::sign_doc_digest(chain.family, signer_address, data)
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        let signature = self.sign_digest(&digest)?;
        Ok(StdSignature::new(
            chain.family,
            self.public_key(),
            signature.as_ref(),
        ))
    }

    async fn verify_arbitrary(
        &self,
        chain_id: &str,
        signer_address: &str,
        data: &[u8],
        signature: &StdSignature,
    ) -> Result<bool, SignerError> {
        let chain = self.chain(chain_id)?;
        Ok(verify_std_signature(chain, signer_address, data, signature))
    }
}
