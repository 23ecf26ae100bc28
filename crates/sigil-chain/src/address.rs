//! Address codec: bech32 textual addresses and 20-byte raw hex accounts.
//!
//! Cosmos SDK accounts are `RIPEMD160(SHA256(compressed_pubkey))`; EVM
//! accounts (including Ethermint chains that render them in bech32) are the
//! last 20 bytes of `Keccak256(uncompressed_pubkey[1..])`.
//!
//! # Example
//!
//! ```
//! use sigil_chain::address::{to_raw_hex, to_textual};
//!
//! let hex = to_raw_hex("cosmos1w508d6qejxtdg4y5r3zarvary0c5xw7k6ah60c", "cosmos").unwrap();
//! assert_eq!(hex, "0x751e76e8199196d454941c45d1b3a323f1433bd6");
//! assert_eq!(
//!     to_textual(&hex, "cosmos").unwrap(),
//!     "cosmos1w508d6qejxtdg4y5r3zarvary0c5xw7k6ah60c"
//! );
//! ```

use alloy_primitives::Address;
use bech32::{FromBase32, ToBase32, Variant};
use sigil_core::error::{AddressError, AddressResult};
use sigil_core::types::{ChainDescriptor, ChainFamily, SignerIdentity};
use sigil_crypto::keypair::Secp256k1PublicKey;

/// Length of an account payload.
pub const ACCOUNT_LEN: usize = 20;

/// Decodes a bech32 address and returns its payload as lowercase `0x` hex.
///
/// # Errors
///
/// - [`AddressError::InvalidBech32`] for a bad checksum, charset, mixed case
///   or a bech32m encoding
/// - [`AddressError::PrefixMismatch`] if the prefix is not `expected_prefix`
/// - [`AddressError::InvalidLength`] if the payload is not 20 bytes
pub fn to_raw_hex(textual: &str, expected_prefix: &str) -> AddressResult<String> {
    decode_bech32(textual, expected_prefix).map(|account| format!("0x{}", hex::encode(account)))
}

/// Like [`to_raw_hex`], and also checks that the address belongs to
/// `public_key` under the derivation rule of `family`.
///
/// # Errors
///
/// Everything [`to_raw_hex`] returns, plus [`AddressError::InvalidPublicKey`]
/// and [`AddressError::PublicKeyMismatch`].
pub fn to_raw_hex_for_key(
    textual: &str,
    expected_prefix: &str,
    family: ChainFamily,
    public_key: &[u8],
) -> AddressResult<String> {
    let account = decode_bech32(textual, expected_prefix)?;
    let key = Secp256k1PublicKey::from_sec1_bytes(public_key)?;
    if account != account_bytes(family, &key) {
        return Err(AddressError::public_key_mismatch(textual));
    }
    Ok(format!("0x{}", hex::encode(account)))
}

/// Encodes a 20-byte raw hex account as bech32 with `prefix`.
///
/// The `0x` prefix is optional and hex digits are case-insensitive.
///
/// # Errors
///
/// - [`AddressError::InvalidHex`] if `raw_hex` is not hex
/// - [`AddressError::InvalidLength`] if it is not 20 bytes
/// - [`AddressError::InvalidBech32`] if `prefix` is not a valid prefix
pub fn to_textual(raw_hex: &str, prefix: &str) -> AddressResult<String> {
    let account = parse_raw_hex(raw_hex)?;
    bech32::encode(prefix, account.to_base32(), Variant::Bech32)
        .map_err(|e| AddressError::invalid_bech32(prefix, e))
}

/// EIP-55 mixed-case rendering of a raw hex account.
///
/// # Errors
///
/// See [`parse_raw_hex`].
pub fn to_checksum_hex(raw_hex: &str) -> AddressResult<String> {
    parse_raw_hex(raw_hex).map(|account| Address::from(account).to_checksum(None))
}

/// Parses `0x`-optional, case-insensitive hex into a 20-byte account.
///
/// # Errors
///
/// Returns [`AddressError::InvalidHex`] or [`AddressError::InvalidLength`].
pub fn parse_raw_hex(raw_hex: &str) -> AddressResult<[u8; ACCOUNT_LEN]> {
    let digits = raw_hex
        .strip_prefix("0x")
        .or_else(|| raw_hex.strip_prefix("0X"))
        .unwrap_or(raw_hex);
    let bytes = hex::decode(digits).map_err(|_| AddressError::invalid_hex(raw_hex))?;
    to_account(bytes)
}

/// The 20-byte account `family` derives from `public_key`.
#[must_use]
pub fn account_bytes(family: ChainFamily, public_key: &Secp256k1PublicKey) -> [u8; ACCOUNT_LEN] {
    match family {
        ChainFamily::CosmosSdk => public_key.cosmos_address(),
        ChainFamily::EvmCompatible => public_key.ethereum_address(),
    }
}

fn decode_bech32(textual: &str, expected_prefix: &str) -> AddressResult<[u8; ACCOUNT_LEN]> {
    let (hrp, data, variant) =
        bech32::decode(textual).map_err(|e| AddressError::invalid_bech32(textual, e))?;
    if variant != Variant::Bech32 {
        return Err(AddressError::invalid_bech32(textual, "bech32m is not supported"));
    }
    if hrp != expected_prefix {
        return Err(AddressError::prefix_mismatch(expected_prefix, hrp));
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| AddressError::invalid_bech32(textual, e))?;
    to_account(bytes)
}

fn to_account(bytes: Vec<u8>) -> AddressResult<[u8; ACCOUNT_LEN]> {
    <[u8; ACCOUNT_LEN]>::try_from(bytes.as_slice()).map_err(|_| AddressError::InvalidLength {
        expected: ACCOUNT_LEN,
        actual: bytes.len(),
    })
}

// ============================================================================
// Signer identity derivation
// ============================================================================

/// Derivation of a [`SignerIdentity`] from a public key.
pub trait SignerIdentityExt: Sized {
    /// Derives both address forms for `chain` from a SEC1 public key.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidPublicKey`] for an invalid key.
    fn from_public_key(chain: &ChainDescriptor, public_key: &[u8]) -> AddressResult<Self>;

    /// Re-derives both address forms and checks they match.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::PublicKeyMismatch`] if either address does
    /// not belong to the public key.
    fn verify_consistency(&self, chain: &ChainDescriptor) -> AddressResult<()>;
}

impl SignerIdentityExt for SignerIdentity {
    fn from_public_key(chain: &ChainDescriptor, public_key: &[u8]) -> AddressResult<Self> {
        let key = Secp256k1PublicKey::from_sec1_bytes(public_key)?;
        let account = account_bytes(chain.family, &key);
        let raw_hex_address = format!("0x{}", hex::encode(account));
        let textual_address = to_textual(&raw_hex_address, &chain.bech32_prefix)?;

        Ok(Self {
            textual_address,
            raw_hex_address,
            public_key: key.compressed().to_vec(),
        })
    }

    fn verify_consistency(&self, chain: &ChainDescriptor) -> AddressResult<()> {
        let expected = Self::from_public_key(chain, &self.public_key)?;
        if !expected.textual_address.eq_ignore_ascii_case(&self.textual_address) {
            return Err(AddressError::public_key_mismatch(&self.textual_address));
        }
        if !expected.raw_hex_address.eq_ignore_ascii_case(&self.raw_hex_address) {
            return Err(AddressError::public_key_mismatch(&self.raw_hex_address));
        }
        Ok(())
    }
}
