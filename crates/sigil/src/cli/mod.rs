//! # CLI Module
//!
//! Command-line interface for Sigil.
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! ## Commands
//!
//! - `sigil init [--force]` - Write the default configuration
//! - `sigil config [path]` - Show the configuration
//! - `sigil chains` - List known chains
//! - `sigil address to-hex|to-bech32|from-pubkey` - Convert address forms
//! - `sigil encode <INTENT> --chain <ID> --pubkey <HEX>` - Encode without signing
//! - `sigil sign <INTENT> --chain <ID> [--no-broadcast]` - Sign with a development key
//! - `sigil verify --chain <ID> ...` - Verify a signature
//! - `sigil recover --message|--typed-data ...` - Recover an EVM signer

pub mod args;
pub mod commands;

pub use args::{AddressCommands, Cli, Commands, ConfigAction, OutputFormat};
