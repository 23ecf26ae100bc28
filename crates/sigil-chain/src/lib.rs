//! # sigil-chain
//!
//! Chain-family specific encoding and verification for the Sigil signing core.
//!
//! ## Modules
//!
//! - [`address`] - bech32 / raw hex address codec and signer identity derivation
//! - [`cosmos`] - Cosmos SDK direct signing (`TxBody`, `AuthInfo`, `SignDoc`,
//!   `TxRaw`) and ADR-036 arbitrary data
//! - [`evm`] - Legacy, EIP-2930 and EIP-1559 envelopes, EIP-191 messages
//! - [`typed_data`] - EIP-712 validation and hashing
//! - [`rlp`] - RLP helpers over `alloy-rlp`
//! - [`encoder`] - [`PayloadEncoder`], dispatching an intent to its family
//! - [`verifier`] - signature verification and identity recovery
//! - [`registry`] - [`ChainRegistry`] of known chains
//!
//! ## Example
//!
//! ```
//! use sigil_chain::{ChainRegistry, PayloadEncoder, SignerIdentityExt};
//! use sigil_core::types::{SignerIdentity, UnsignedIntent};
//! use sigil_crypto::Secp256k1KeyPair;
//!
//! let registry = ChainRegistry::new();
//! let chain = registry.resolve("osmosis-1").expect("built-in chain");
//!
//! let keypair = Secp256k1KeyPair::generate();
//! let identity = SignerIdentity::from_public_key(chain, keypair.public_key().compressed())
//!     .expect("valid key");
//!
//! let intent = UnsignedIntent::ArbitraryBytes { payload: b"login".to_vec() };
//! let encoded = PayloadEncoder::new()
//!     .encode(chain, &identity, &intent)
//!     .expect("encodable");
//! assert_eq!(encoded.kind(), "adr36");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod address;
pub mod cosmos;
pub mod encoder;
pub mod evm;
pub mod registry;
pub mod rlp;
pub mod typed_data;
pub mod verifier;

pub use address::{to_checksum_hex, to_raw_hex, to_raw_hex_for_key, to_textual, SignerIdentityExt};
pub use cosmos::adr36::StdSignature;
pub use cosmos::DirectPayload;
pub use encoder::{EncodedPayload, PayloadEncoder};
pub use registry::ChainRegistry;
pub use verifier::{check_identity, recover_identity, verify, verify_arbitrary, RecoverInput};
