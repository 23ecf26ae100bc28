//! Signature verification and public key recovery.
//!
//! Verification never fails loudly: malformed keys or signatures simply do
//! not verify. Recovery, which produces an identity, reports why it failed.
//!
//! Signatures are accepted as 64-byte `r || s` or 65-byte `r || s || v`,
//! where `v` is a raw recovery id (0, 1) or the Ethereum form (27, 28).
//!
//! ```
//! use sigil_crypto::keypair::Secp256k1KeyPair;
//! use sigil_crypto::verify::{recover_public_key, verify_message, DigestAlgorithm};
//!
//! let keypair = Secp256k1KeyPair::generate();
//! let digest = DigestAlgorithm::Keccak256.hash(b"hello");
//! let signature = keypair.sign(&digest).expect("sign").to_eth_bytes();
//!
//! assert!(verify_message(
//!     DigestAlgorithm::Keccak256,
//!     b"hello",
//!     &signature,
//!     keypair.public_key().compressed(),
//! ));
//! let recovered = recover_public_key(&digest, &signature).expect("recover");
//! assert_eq!(&recovered, keypair.public_key());
//! ```

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::keypair::Secp256k1PublicKey;
use sigil_core::error::RecoveryError;

/// Hash function applied to a message before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-256, used by Cosmos SDK chains.
    Sha256,
    /// Keccak-256, used by EVM chains.
    Keccak256,
}

impl DigestAlgorithm {
    /// Hashes `message`.
    #[must_use]
    pub fn hash(self, message: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha256 => sha256(message),
            Self::Keccak256 => keccak256(message),
        }
    }
}

/// SHA-256 of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Maps a `v` byte to a raw recovery id.
///
/// # Errors
///
/// Returns [`RecoveryError::InvalidRecoveryId`] unless `v` is 0, 1, 27 or 28.
pub const fn normalize_recovery_byte(v: u8) -> Result<u8, RecoveryError> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - 27),
        other => Err(RecoveryError::InvalidRecoveryId(other)),
    }
}

/// Checks `signature` over a 32-byte digest against a SEC1 public key.
///
/// High-S signatures are normalized before checking, so both `s` and `n - s`
/// verify. Returns `false` for any malformed input.
#[must_use]
pub fn verify_prehash(public_key: &[u8], prehash: &[u8; 32], signature: &[u8]) -> bool {
    VerifyingKey::from_sec1_bytes(public_key)
        .is_ok_and(|verifying| verify_parsed(&verifying, prehash, signature, true))
}

/// Same as [`verify_prehash`], but a high-S signature does not verify.
#[must_use]
pub fn verify_prehash_low_s(public_key: &[u8], prehash: &[u8; 32], signature: &[u8]) -> bool {
    VerifyingKey::from_sec1_bytes(public_key)
        .is_ok_and(|verifying| verify_parsed(&verifying, prehash, signature, false))
}

/// Hashes `message` with `algorithm` and checks the signature.
#[must_use]
pub fn verify_message(
    algorithm: DigestAlgorithm,
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> bool {
    verify_prehash(public_key, &algorithm.hash(message), signature)
}

/// Same as [`verify_prehash`], with an already parsed key.
#[must_use]
pub fn verify_with_key(
    public_key: &Secp256k1PublicKey,
    prehash: &[u8; 32],
    signature: &[u8],
) -> bool {
    public_key
        .verifying_key()
        .is_some_and(|verifying| verify_parsed(&verifying, prehash, signature, true))
}

fn verify_parsed(
    verifying: &VerifyingKey,
    prehash: &[u8; 32],
    signature: &[u8],
    allow_high_s: bool,
) -> bool {
    let rs = match signature.len() {
        64 | 65 => &signature[..64],
        _ => return false,
    };
    let Ok(sig) = K256Signature::from_slice(rs) else {
        return false;
    };
    let sig = match sig.normalize_s() {
        Some(_) if !allow_high_s => return false,
        Some(normalized) => normalized,
        None => sig,
    };
    verifying.verify_prehash(prehash, &sig).is_ok()
}

/// Recovers the signing public key from a 65-byte signature over `prehash`.
///
/// # Errors
///
/// - [`RecoveryError::MalformedSignature`] if the signature is not 65 bytes
///   or its scalars are out of range
/// - [`RecoveryError::InvalidRecoveryId`] if `v` is not 0, 1, 27 or 28
/// - [`RecoveryError::RecoveryFailed`] if no key recovers
pub fn recover_public_key(
    prehash: &[u8; 32],
    signature: &[u8],
) -> Result<Secp256k1PublicKey, RecoveryError> {
    let [rs @ .., v] = signature else {
        return Err(RecoveryError::malformed("empty signature"));
    };
    if signature.len() != 65 {
        return Err(RecoveryError::malformed(format!(
            "expected 65 bytes, got {}",
            signature.len()
        )));
    }

    let mut recid = normalize_recovery_byte(*v)?;
    let sig = K256Signature::from_slice(rs)
        .map_err(|e| RecoveryError::malformed(format!("invalid r/s: {e}")))?;
    let sig = match sig.normalize_s() {
        Some(normalized) => {
            recid ^= 1;
            normalized
        }
        None => sig,
    };

    let recovery_id = RecoveryId::from_byte(recid).ok_or(RecoveryError::InvalidRecoveryId(*v))?;
    let verifying = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|_| RecoveryError::RecoveryFailed)?;

    Ok(Secp256k1PublicKey::from_verifying_key(&verifying))
}

/// Recovers the 20-byte Ethereum address that produced `signature`.
///
/// # Errors
///
/// See [`recover_public_key`].
pub fn recover_address(prehash: &[u8; 32], signature: &[u8]) -> Result<[u8; 20], RecoveryError> {
    recover_public_key(prehash, signature).map(|key| key.ethereum_address())
}
