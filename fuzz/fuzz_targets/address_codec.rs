//! Fuzz target for the bech32 address codec.
//!
//! Any string must either be rejected or decode to a raw account that
//! encodes back to the same address, lowercased.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run address_codec
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigil_chain::{to_raw_hex, to_textual};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let prefix = input
        .rsplit_once('1')
        .map_or_else(|| "osmo".to_string(), |(hrp, _)| hrp.to_ascii_lowercase());
    if let Ok(raw) = to_raw_hex(input, &prefix) {
        let textual = to_textual(&raw, &prefix).expect("decoded account must re-encode");
        assert_eq!(textual, input.to_ascii_lowercase());
    }

    let _ = to_textual(input, "cosmos");
});
