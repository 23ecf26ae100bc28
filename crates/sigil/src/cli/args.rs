//! # CLI Argument Definitions
//!
//! The command-line interface, defined with clap derive macros:
//!
//! - `sigil init` - Write the default configuration
//! - `sigil config [path]` - Show the configuration or its location
//! - `sigil chains` - List known chains
//! - `sigil address <to-hex|to-bech32|from-pubkey>` - Convert address forms
//! - `sigil encode <INTENT>` - Encode an intent without signing it
//! - `sigil sign <INTENT>` - Resolve, sign and broadcast with a development key
//! - `sigil verify` - Verify a signature over arbitrary data
//! - `sigil recover` - Recover the signer of an EVM identity proof
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file
//! - `--log-format <FORMAT>` - Log output format
//! - `--log-file <PATH>` - Also write logs to a daily-rotated file

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::logging::LogFormat;

/// Chain-agnostic transaction signing and verification.
#[derive(Debug, Parser)]
#[command(name = "sigil")]
#[command(author, version, about = "Chain-agnostic transaction signing and verification")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.sigil/config.toml`. Built-in defaults apply when the
    /// default file does not exist.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty", value_name = "FORMAT")]
    pub log_format: LogFormat,

    /// Also write logs to a daily-rotated file at this path
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default configuration to ~/.sigil/config.toml
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config {
        /// Configuration action to perform
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// List known chains
    Chains,

    /// Convert between address forms
    Address {
        /// Address command to execute
        #[command(subcommand)]
        command: AddressCommands,
    },

    /// Encode an intent into the bytes a signer would see
    ///
    /// No chain state is fetched: account number, sequence, nonce and fees
    /// are taken from the intent file as given.
    Encode {
        /// JSON intent file
        #[arg(value_name = "INTENT")]
        intent: PathBuf,

        /// Chain identifier
        #[arg(long)]
        chain: String,

        /// Signer public key (33-byte compressed or 65-byte uncompressed hex)
        #[arg(long, value_name = "HEX")]
        pubkey: String,

        /// Output format
        #[arg(short, long, default_value = "hex", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Resolve, sign and broadcast an intent with a development key
    ///
    /// The secret key is read from the `SIGIL_DEV_KEY` environment variable.
    /// Development and testing only.
    Sign {
        /// JSON intent file
        #[arg(value_name = "INTENT")]
        intent: PathBuf,

        /// Chain identifier
        #[arg(long)]
        chain: String,

        /// Do not broadcast the signed transaction
        #[arg(long)]
        no_broadcast: bool,

        /// Output format
        #[arg(short, long, default_value = "json", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Verify a signature over arbitrary data
    ///
    /// With `--address` the signature is checked as an ADR-036 document
    /// bound to that address; otherwise the message is hashed with the
    /// chain's digest and checked directly.
    Verify {
        /// Chain identifier
        #[arg(long)]
        chain: String,

        /// Signed message (UTF-8, or hex with --hex)
        #[arg(long)]
        message: String,

        /// Treat --message as hex
        #[arg(long)]
        hex: bool,

        /// Signature hex (64 or 65 bytes)
        #[arg(long, value_name = "HEX")]
        signature: String,

        /// Signer public key hex
        #[arg(long, value_name = "HEX")]
        pubkey: String,

        /// Bech32 signer address for ADR-036 verification
        #[arg(long)]
        address: Option<String>,
    },

    /// Recover the signer of an EIP-712 or EIP-191 signature
    Recover {
        /// EIP-712 typed-data JSON file
        #[arg(long, value_name = "FILE", conflicts_with = "message", required_unless_present = "message")]
        typed_data: Option<PathBuf>,

        /// EIP-191 personal message (UTF-8)
        #[arg(long)]
        message: Option<String>,

        /// 65-byte signature hex
        #[arg(long, value_name = "HEX")]
        signature: String,

        /// Expected signer address; a mismatch exits with status 1
        #[arg(long, value_name = "ADDRESS")]
        expected: Option<String>,
    },
}

/// Configuration-related actions.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,
}

/// Address conversions.
#[derive(Debug, Clone, Subcommand)]
pub enum AddressCommands {
    /// Bech32 address to 0x hex
    ToHex {
        /// Bech32 address
        address: String,

        /// Chain whose prefix the address must carry
        #[arg(long)]
        chain: String,
    },

    /// 0x hex to bech32 address
    ToBech32 {
        /// 20-byte hex account
        hex: String,

        /// Chain whose prefix to use
        #[arg(long)]
        chain: String,
    },

    /// Both address forms of a public key
    FromPubkey {
        /// Public key hex
        pubkey: String,

        /// Chain whose derivation rule and prefix to use
        #[arg(long)]
        chain: String,
    },
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Hexadecimal output
    #[default]
    Hex,

    /// JSON output with details
    Json,
}
