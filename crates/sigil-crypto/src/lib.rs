//! # sigil-crypto
//!
//! secp256k1 primitives for the Sigil signing core.
//!
//! ## Modules
//!
//! - [`keys`] - Zeroizing secret key container
//! - [`keypair`] - Key pairs, public keys with Cosmos and Ethereum address
//!   derivation, recoverable signatures
//! - [`verify`] - Digest selection, signature verification, public key recovery
//!
//! Production signing happens in an external signer; the key pair here backs
//! the development signer and the test suite.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod keypair;
pub mod keys;
pub mod verify;

pub use keypair::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use keys::{SecretKey, SECRET_KEY_LEN};
pub use verify::{
    keccak256, normalize_recovery_byte, recover_address, recover_public_key, sha256,
    verify_message, verify_prehash, verify_prehash_low_s, verify_with_key, DigestAlgorithm,
};
