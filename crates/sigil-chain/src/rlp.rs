//! RLP helpers over `alloy-rlp` for building and inspecting EVM envelopes.
//!
//! Encoding goes through [`ListEncoder`], which appends fields in order and
//! prefixes the list header on [`finish`](ListEncoder::finish). Decoding
//! helpers map `alloy-rlp` failures onto [`EncodeError::MalformedEnvelope`].
//!
//! # Example
//!
//! ```
//! use sigil_chain::rlp::{decode_list, decode_u64, detect_tx_type, ListEncoder};
//!
//! let mut list = ListEncoder::new();
//! list.push(&9u64).push_bytes(&[]);
//! let encoded = list.finish();
//! assert_eq!(encoded, vec![0xc2, 0x09, 0x80]);
//! assert_eq!(detect_tx_type(&encoded), None);
//!
//! let items = decode_list(&encoded).expect("list");
//! assert_eq!(decode_u64(items[0]).expect("u64"), 9);
//! ```

use alloy_primitives::{Address, U256};
use alloy_rlp::{Decodable, Encodable, Header, PayloadView};
use sigil_core::error::{EncodeError, EncodeResult};

// ============================================================================
// Encoding
// ============================================================================

/// Builds an RLP list field by field.
#[derive(Debug, Default, Clone)]
pub struct ListEncoder {
    payload: Vec<u8>,
}

impl ListEncoder {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any RLP-encodable value (integers, `U256`, `Address`, `Bytes`).
    pub fn push<T: Encodable + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(&mut self.payload);
        self
    }

    /// Appends a byte string.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        bytes.encode(&mut self.payload);
        self
    }

    /// Appends an already RLP-encoded item verbatim.
    pub fn push_raw(&mut self, encoded: &[u8]) -> &mut Self {
        self.payload.extend_from_slice(encoded);
        self
    }

    /// Appends an optional address; `None` encodes as the empty string.
    pub fn push_optional_address(&mut self, address: Option<&Address>) -> &mut Self {
        match address {
            Some(address) => self.push(address),
            None => self.push_bytes(&[]),
        }
    }

    /// Returns the list header followed by the payload.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let header = Header {
            list: true,
            payload_length: self.payload.len(),
        };
        let mut out = Vec::with_capacity(header.length() + self.payload.len());
        header.encode(&mut out);
        out.extend_from_slice(&self.payload);
        out
    }
}

// ============================================================================
// Transaction Type Detection
// ============================================================================

/// Returns the EIP-2718 type byte, or `None` for legacy (RLP list prefix),
/// unknown prefixes and empty input.
#[must_use]
pub fn detect_tx_type(data: &[u8]) -> Option<u8> {
    data.first().copied().filter(|b| *b <= 0x7f)
}

/// Returns `true` if `data` starts with an RLP list prefix (`0xc0..=0xff`).
#[must_use]
pub fn is_list(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b >= 0xc0)
}

/// Strips the type byte of a typed envelope; legacy envelopes pass through.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if `data` is empty.
pub fn typed_tx_payload(data: &[u8]) -> EncodeResult<&[u8]> {
    match data.split_first() {
        None => Err(EncodeError::malformed_envelope("empty transaction data")),
        Some((first, rest)) if *first <= 0x7f => Ok(rest),
        Some(_) => Ok(data),
    }
}

// ============================================================================
// Decoding Helpers
// ============================================================================

/// Decodes an RLP byte string.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if `data` is not an RLP string.
pub fn decode_bytes(data: &[u8]) -> EncodeResult<Vec<u8>> {
    let mut buf = data;
    Header::decode_bytes(&mut buf, false)
        .map(<[u8]>::to_vec)
        .map_err(|e| EncodeError::malformed_envelope(format!("failed to decode bytes: {e}")))
}

/// Splits an RLP list into its raw encoded items.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] if `data` is not an RLP list.
pub fn decode_list(data: &[u8]) -> EncodeResult<Vec<&[u8]>> {
    let mut buf = data;
    let payload = Header::decode_raw(&mut buf)
        .map_err(|e| EncodeError::malformed_envelope(format!("failed to decode list: {e}")))?;

    if !buf.is_empty() {
        return Err(EncodeError::malformed_envelope(format!(
            "{} trailing bytes after list",
            buf.len()
        )));
    }

    match payload {
        PayloadView::List(items) => Ok(items),
        PayloadView::String(_) => Err(EncodeError::malformed_envelope(
            "expected list, found string",
        )),
    }
}

/// Decodes an RLP integer into a `U256`.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] on invalid encoding.
pub fn decode_u256(data: &[u8]) -> EncodeResult<U256> {
    let mut buf = data;
    U256::decode(&mut buf)
        .map_err(|e| EncodeError::malformed_envelope(format!("failed to decode U256: {e}")))
}

/// Decodes an RLP integer into a `u64`.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] on invalid encoding or overflow.
pub fn decode_u64(data: &[u8]) -> EncodeResult<u64> {
    let mut buf = data;
    u64::decode(&mut buf)
        .map_err(|e| EncodeError::malformed_envelope(format!("failed to decode u64: {e}")))
}

/// Decodes a recipient field: empty string for contract creation, else 20 bytes.
///
/// # Errors
///
/// Returns [`EncodeError::MalformedEnvelope`] on invalid encoding.
pub fn decode_optional_address(data: &[u8]) -> EncodeResult<Option<Address>> {
    if data == [alloy_rlp::EMPTY_STRING_CODE] {
        return Ok(None);
    }
    let mut buf = data;
    Address::decode(&mut buf)
        .map(Some)
        .map_err(|e| EncodeError::malformed_envelope(format!("failed to decode address: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::indexing_slicing
    )]

    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_detect_tx_type() {
        assert_eq!(detect_tx_type(&[0x02, 0xf8]), Some(2));
        assert_eq!(detect_tx_type(&[0x01, 0xf8]), Some(1));
        assert_eq!(detect_tx_type(&[0xf8, 0x6c]), None);
        assert_eq!(detect_tx_type(&[]), None);
    }

    #[test]
    fn test_is_list() {
        assert!(is_list(&[0xc0]));
        assert!(is_list(&[0xf8, 0x6c]));
        assert!(!is_list(&[0x02]));
        assert!(!is_list(&[0x80]));
        assert!(!is_list(&[]));
    }

    #[test]
    fn test_typed_tx_payload() {
        assert_eq!(typed_tx_payload(&[0x02, 0xc0]).unwrap(), &[0xc0]);
        assert_eq!(typed_tx_payload(&[0xc1, 0x01]).unwrap(), &[0xc1, 0x01]);
        assert!(matches!(
            typed_tx_payload(&[]),
            Err(EncodeError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_list_encoder_scalars() {
        let mut list = ListEncoder::new();
        list.push(&0u64)
            .push(&U256::from(1_000_000_000_000_000_000u64))
            .push(&0x0bu8);
        // 0 -> 0x80, 1 ether -> 0x88 + 8 bytes, 0x0b -> 0x0b
        assert_eq!(
            hex::encode(list.finish()),
            "cb80880de0b6b3a76400000b"
        );
    }

    #[test]
    fn test_list_encoder_long_payload_header() {
        let mut list = ListEncoder::new();
        list.push_bytes(&[0xaa; 60]);
        let out = list.finish();
        // payload = 0xb8 0x3c + 60 bytes = 62 bytes, header 0xf8 0x3e
        assert_eq!(&out[..4], &[0xf8, 0x3e, 0xb8, 0x3c]);
        assert_eq!(out.len(), 64);
    }

    #[test]
    fn test_optional_address_roundtrip() {
        let addr = address!("3535353535353535353535353535353535353535");
        let mut list = ListEncoder::new();
        list.push_optional_address(Some(&addr))
            .push_optional_address(None);
        let encoded = list.finish();

        let items = decode_list(&encoded).expect("list");
        assert_eq!(items.len(), 2);
        assert_eq!(decode_optional_address(items[0]).unwrap(), Some(addr));
        assert_eq!(decode_optional_address(items[1]).unwrap(), None);
    }

    #[test]
    fn test_push_raw_nests_lists() {
        let inner = ListEncoder::new().finish();
        let mut outer = ListEncoder::new();
        outer.push_raw(&inner);
        assert_eq!(outer.finish(), vec![0xc1, 0xc0]);
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode_list(&[0x80]).is_err());
        assert!(decode_list(&[0xc1, 0x01, 0x02]).is_err());
        assert!(decode_u64(&[0xc0]).is_err());
        assert!(decode_bytes(&[0xc0]).is_err());
        assert_eq!(decode_bytes(&[0x83, 1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }
}
