//! Secret key material with zeroization on drop.
//!
//! Sigil never stores keys: the production signer is external. A
//! [`SecretKey`] exists only to back the development signer and tests.

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sigil_core::error::SignError;

/// The length of a secret key in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// A 32-byte secp256k1 secret scalar.
///
/// Not `Clone`; debug output is redacted and equality is constant-time.
///
/// ```
/// use sigil_crypto::keys::SecretKey;
///
/// let key = SecretKey::from_hex(
///     "0x0000000000000000000000000000000000000000000000000000000000000001",
/// ).expect("valid hex");
/// assert_eq!(format!("{key:?}"), "SecretKey([REDACTED])");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Wraps raw key bytes. The caller should zeroize its own copy.
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generates a key from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parses a 32-byte hex string, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the string is not 64 hex digits.
    pub fn from_hex(s: &str) -> Result<Self, SignError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);

        let mut decoded = hex::decode(s).map_err(|_| SignError::InvalidKey)?;
        let result = <[u8; SECRET_KEY_LEN]>::try_from(decoded.as_slice())
            .map(Self::new)
            .map_err(|_| SignError::InvalidKey);
        decoded.zeroize();
        result
    }

    /// Raw bytes, for the immediate cryptographic operation only.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

impl From<[u8; SECRET_KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}
