//! Fuzz target for decoding signed Cosmos transactions.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run cosmos_tx_raw
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigil_chain::cosmos;

fuzz_target!(|data: &[u8]| {
    if let Ok(tx) = cosmos::decode_tx_raw(data) {
        let _ = cosmos::decode_auth_info(&tx.auth_info_bytes);
        if let Some(signature) = tx.signatures.first() {
            let rebuilt =
                cosmos::assemble_tx_raw(&tx.body_bytes, &tx.auth_info_bytes, signature);
            assert_eq!(cosmos::tx_hash(&rebuilt).len(), 64);
        }
    }
});
