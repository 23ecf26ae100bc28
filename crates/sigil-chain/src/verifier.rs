//! Signature verifier.
//!
//! Boolean checks ([`verify`], [`verify_arbitrary`]) never error: malformed
//! input simply does not verify. Recovery ([`recover_identity`]) produces an
//! identity and reports why it could not.
//!
//! # Example
//!
//! ```
//! use sigil_chain::verifier::{check_identity, RecoverInput};
//! use sigil_chain::evm::personal_message_hash;
//! use sigil_crypto::keypair::Secp256k1KeyPair;
//!
//! let keypair = Secp256k1KeyPair::generate();
//! let expected = format!("0x{}", hex::encode(keypair.public_key().ethereum_address()));
//! let signature = keypair
//!     .sign(&personal_message_hash(b"hello"))
//!     .expect("sign")
//!     .to_eth_bytes();
//!
//! let outcome = check_identity(RecoverInput::PersonalMessage(b"hello"), &signature, &expected)
//!     .expect("recover");
//! assert!(outcome.matched);
//! ```

use sigil_core::error::RecoveryError;
use sigil_core::types::{ChainDescriptor, ChainFamily, TypedData, VerificationOutcome};
use sigil_crypto::verify::{recover_address, verify_prehash, verify_prehash_low_s};

use crate::address::to_raw_hex_for_key;
use crate::cosmos::adr36::{self, StdSignature};
use crate::{evm, typed_data};

/// Verifies `signature` over `message` with the digest of `family`:
/// SHA-256 for Cosmos SDK, Keccak-256 for EVM-compatible chains.
///
/// Accepts 64-byte `r || s` and 65-byte `r || s || v` signatures. Cosmos SDK
/// chains only accept low-S signatures; EVM-compatible chains also accept
/// the high-S form, as `ecrecover` does.
#[must_use]
pub fn verify(family: ChainFamily, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let digest = adr36::digest_algorithm(family).hash(message);
    verify_digest(family, &digest, signature, public_key)
}

fn verify_digest(family: ChainFamily, digest: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool {
    match family {
        ChainFamily::CosmosSdk => verify_prehash_low_s(public_key, digest, signature),
        ChainFamily::EvmCompatible => verify_prehash(public_key, digest, signature),
    }
}

/// Verifies an ADR-036 signature over `data` by `signer_address`.
///
/// The address must carry the chain's prefix and belong to `public_key`
/// under the chain's derivation rule.
#[must_use]
pub fn verify_arbitrary(
    chain: &ChainDescriptor,
    signer_address: &str,
    data: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> bool {
    if to_raw_hex_for_key(signer_address, &chain.bech32_prefix, chain.family, public_key).is_err() {
        return false;
    }
    adr36::sign_doc_digest(chain.family, signer_address, data)
        .is_ok_and(|digest| verify_digest(chain.family, &digest, signature, public_key))
}

/// [`verify_arbitrary`] over an amino [`StdSignature`].
#[must_use]
pub fn verify_std_signature(
    chain: &ChainDescriptor,
    signer_address: &str,
    data: &[u8],
    signature: &StdSignature,
) -> bool {
    match (signature.public_key_bytes(), signature.signature_bytes()) {
        (Ok(public_key), Ok(sig)) => verify_arbitrary(chain, signer_address, data, &sig, &public_key),
        _ => false,
    }
}

/// What a recoverable signature was computed over.
#[derive(Debug, Clone, Copy)]
pub enum RecoverInput<'a> {
    /// An EIP-712 document.
    TypedData(&'a TypedData),
    /// An EIP-191 personal message, without prefix.
    PersonalMessage(&'a [u8]),
    /// A precomputed 32-byte digest.
    Prehash([u8; 32]),
}

impl RecoverInput<'_> {
    /// The digest the signature commits to.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidDocument`] if typed data does not hash.
    pub fn digest(&self) -> Result<[u8; 32], RecoveryError> {
        match self {
            Self::TypedData(document) => typed_data::signing_hash(document)
                .map(|hash| hash.0)
                .map_err(|e| RecoveryError::invalid_document(e.to_string())),
            Self::PersonalMessage(message) => Ok(evm::personal_message_hash(message)),
            Self::Prehash(digest) => Ok(*digest),
        }
    }
}

/// Recovers the lowercase `0x` hex address that produced `signature`.
///
/// # Errors
///
/// - [`RecoveryError::MalformedSignature`] unless the signature is 65 bytes
///   with in-range scalars
/// - [`RecoveryError::InvalidRecoveryId`] unless `v` is 0, 1, 27 or 28
/// - [`RecoveryError::InvalidDocument`] if typed data does not hash
pub fn recover_identity(input: RecoverInput<'_>, signature: &[u8]) -> Result<String, RecoveryError> {
    let digest = input.digest()?;
    recover_address(&digest, signature).map(|address| format!("0x{}", hex::encode(address)))
}

/// Recovers the signer and compares it with `expected_hex`, ignoring case
/// and an optional `0x` prefix.
///
/// # Errors
///
/// See [`recover_identity`].
pub fn check_identity(
    input: RecoverInput<'_>,
    signature: &[u8],
    expected_hex: &str,
) -> Result<VerificationOutcome, RecoveryError> {
    let recovered = recover_identity(input, signature)?;
    Ok(VerificationOutcome {
        matched: strip_0x(&recovered).eq_ignore_ascii_case(strip_0x(expected_hex)),
        recovered_identity: recovered,
    })
}

fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}
