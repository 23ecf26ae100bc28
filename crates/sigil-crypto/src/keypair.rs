//! secp256k1 key pairs, public keys and recoverable signatures.
//!
//! Both address families Sigil supports derive from the same secp256k1 key:
//!
//! - Cosmos SDK: `RIPEMD160(SHA256(compressed_pubkey))`
//! - EVM: last 20 bytes of `Keccak256(uncompressed_pubkey[1..])`
//!
//! # Example
//!
//! ```rust
//! use sigil_crypto::keypair::Secp256k1KeyPair;
//!
//! let keypair = Secp256k1KeyPair::generate();
//! let pubkey = keypair.public_key();
//! assert_eq!(pubkey.compressed().len(), 33);
//! assert_eq!(pubkey.cosmos_address().len(), 20);
//!
//! let signature = keypair.sign(&[7u8; 32]).expect("signing failed");
//! assert!(keypair.verify(&[7u8; 32], &signature));
//! ```

use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::keys::SecretKey;
use sigil_core::error::{AddressError, SignError};

// ============================================================================
// Secp256k1 Public Key
// ============================================================================

/// A secp256k1 public key, cached in both SEC1 encodings.
#[derive(Clone, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    compressed: [u8; 33],
    uncompressed: [u8; 65],
}

impl Secp256k1PublicKey {
    pub(crate) fn from_verifying_key(verifying: &VerifyingKey) -> Self {
        let mut uncompressed = [0u8; 65];
        uncompressed.copy_from_slice(verifying.to_encoded_point(false).as_bytes());

        let mut compressed = [0u8; 33];
        compressed.copy_from_slice(verifying.to_encoded_point(true).as_bytes());

        Self {
            compressed,
            uncompressed,
        }
    }

    /// Parses a 33-byte compressed or 65-byte uncompressed SEC1 key.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidPublicKey`] if the bytes are not a
    /// point on the curve.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != 33 && bytes.len() != 65 {
            return Err(AddressError::invalid_public_key(format!(
                "expected 33 or 65 bytes, got {}",
                bytes.len()
            )));
        }
        let verifying = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| AddressError::invalid_public_key(e.to_string()))?;
        Ok(Self::from_verifying_key(&verifying))
    }

    /// Compressed encoding: `0x02|0x03 || X`.
    #[must_use]
    pub const fn compressed(&self) -> &[u8; 33] {
        &self.compressed
    }

    /// Uncompressed encoding: `0x04 || X || Y`.
    #[must_use]
    pub const fn uncompressed(&self) -> &[u8; 65] {
        &self.uncompressed
    }

    /// Ethereum account bytes: last 20 bytes of `Keccak256(X || Y)`.
    #[must_use]
    pub fn ethereum_address(&self) -> [u8; 20] {
        let hash = Keccak256::digest(&self.uncompressed[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        address
    }

    /// Cosmos account bytes: `RIPEMD160(SHA256(compressed))`.
    #[must_use]
    pub fn cosmos_address(&self) -> [u8; 20] {
        let sha = Sha256::digest(self.compressed);
        let hash = Ripemd160::digest(sha);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash);
        address
    }

    pub(crate) fn verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.compressed).ok()
    }
}

impl AsRef<[u8]> for Secp256k1PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.compressed
    }
}

impl std::fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1PublicKey({})", hex::encode(self.compressed))
    }
}

// ============================================================================
// Secp256k1 Signature
// ============================================================================

/// A low-S ECDSA signature (`r || s`) with its recovery id.
#[derive(Clone, PartialEq, Eq)]
pub struct Secp256k1Signature {
    bytes: [u8; 64],
    recovery_id: u8,
}

impl Secp256k1Signature {
    /// Reassembles a signature from `r || s` and a recovery id (0 or 1).
    #[must_use]
    pub const fn from_bytes_and_recovery_id(bytes: [u8; 64], recovery_id: u8) -> Self {
        Self { bytes, recovery_id }
    }

    /// Recovery id, 0 or 1.
    #[must_use]
    pub const fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    /// `r || s || recid` with `recid` in {0, 1}.
    #[must_use]
    pub fn to_recoverable_bytes(&self) -> [u8; 65] {
        let mut result = [0u8; 65];
        result[..64].copy_from_slice(&self.bytes);
        result[64] = self.recovery_id;
        result
    }

    /// `r || s || v` with `v = 27 + recid`, the `personal_sign` and
    /// `eth_signTypedData` convention.
    #[must_use]
    pub fn to_eth_bytes(&self) -> [u8; 65] {
        let mut result = self.to_recoverable_bytes();
        result[64] += 27;
        result
    }

    /// The `r` scalar.
    #[must_use]
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.bytes[..32]);
        r
    }

    /// The `s` scalar.
    #[must_use]
    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.bytes[32..]);
        s
    }
}

impl AsRef<[u8]> for Secp256k1Signature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Secp256k1Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Secp256k1Signature(r={}, s={}, v={})",
            hex::encode(self.r()),
            hex::encode(self.s()),
            self.recovery_id
        )
    }
}

// ============================================================================
// Secp256k1 Key Pair
// ============================================================================

/// A secp256k1 key pair. Backs the development signer only.
#[allow(clippy::struct_field_names)]
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    public_key: Secp256k1PublicKey,
}

impl Secp256k1KeyPair {
    /// Generates a random key pair.
    #[must_use]
    pub fn generate() -> Self {
        loop {
            if let Ok(keypair) = Self::from_secret_key(&SecretKey::generate()) {
                return keypair;
            }
        }
    }

    /// Builds a key pair from raw scalar bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] for zero or out-of-range scalars.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SignError> {
        let signing_key = SigningKey::from_bytes(bytes.into()).map_err(|_| SignError::InvalidKey)?;
        let verifying_key = *signing_key.verifying_key();
        let public_key = Secp256k1PublicKey::from_verifying_key(&verifying_key);

        Ok(Self {
            signing_key,
            verifying_key,
            public_key,
        })
    }

    /// Builds a key pair from a [`SecretKey`].
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] for zero or out-of-range scalars.
    pub fn from_secret_key(secret: &SecretKey) -> Result<Self, SignError> {
        Self::from_bytes(secret.as_bytes())
    }

    /// The public key.
    #[must_use]
    pub const fn public_key(&self) -> &Secp256k1PublicKey {
        &self.public_key
    }

    /// Signs a 32-byte digest. The result is normalized to low-S.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::SignatureFailed`] if k256 refuses the digest.
    pub fn sign(&self, hash: &[u8; 32]) -> Result<Secp256k1Signature, SignError> {
        let (signature, recovery_id): (K256Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| SignError::signature_failed(format!("secp256k1 signing failed: {e}")))?;

        let normalized = signature.normalize_s();
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&normalized.unwrap_or(signature).to_bytes());

        // Negating s flips the parity of R's y coordinate.
        let recovery_id = if normalized.is_some() {
            recovery_id.to_byte() ^ 1
        } else {
            recovery_id.to_byte()
        };

        Ok(Secp256k1Signature { bytes, recovery_id })
    }

    /// Checks a signature against a digest with this key.
    #[must_use]
    pub fn verify(&self, hash: &[u8; 32], signature: &Secp256k1Signature) -> bool {
        use k256::ecdsa::signature::hazmat::PrehashVerifier;

        let Ok(k256_sig) = K256Signature::from_slice(signature.as_ref()) else {
            return false;
        };
        self.verifying_key.verify_prehash(hash, &k256_sig).is_ok()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
