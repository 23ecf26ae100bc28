//! # Integration Tests for Sigil
//!
//! ## Test Organization
//!
//! - `common/` - Scripted signer, provider and broadcaster
//! - `e2e/` - Full dispatches and command handlers
//! - `unit/` - Error mapping, argument parsing, codec properties
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test integration
//! cargo test --test integration sign_flow
//! ```

#![allow(clippy::expect_used)]

mod common;
mod e2e;
mod unit;

#[cfg(test)]
mod tests {
    use super::common;

    #[test]
    fn test_temp_data_dir_creation() {
        let temp_dir = common::temp_data_dir();
        let path = temp_dir.path();
        assert!(path.is_dir());

        let test_file = path.join("test.txt");
        std::fs::write(&test_file, "test content").expect("write to temp dir");
        assert!(test_file.exists());
    }

    #[test]
    fn test_key_one_identities() {
        let osmo = common::identity("osmosis-1");
        assert_eq!(osmo.textual_address, "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2");

        let evmos = common::identity("evmos_9001-2");
        assert_eq!(evmos.raw_hex_address, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert_eq!(evmos.public_key, osmo.public_key);
    }
}
