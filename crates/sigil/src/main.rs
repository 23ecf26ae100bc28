//! # Sigil
//!
//! Chain-agnostic transaction signing and verification.
//!
//! ## Usage
//!
//! ```bash
//! # Write the default configuration
//! sigil init
//!
//! # Convert an address
//! sigil address to-hex osmo1... --chain osmosis-1
//!
//! # Show what a signer would be asked to sign
//! sigil encode tx.json --chain osmosis-1 --pubkey 02...
//!
//! # Sign and broadcast with a development key
//! SIGIL_DEV_KEY=... sigil sign tx.json --chain osmosis-1
//!
//! # Recover an EIP-191 signer
//! sigil recover --message hello --signature 0x...
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use clap::Parser;
use sigil::cli::commands::exit_codes::EXIT_ERROR;
use sigil::cli::commands::{
    AddressCommand, ChainsCommand, ConfigCommand, EncodeCommand, InitCommand, RecoverCommand,
    SignCommand, VerifyCommand,
};
use sigil::cli::{Cli, Commands};
use sigil::logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard};

/// Set up logging from the global flags.
///
/// # Errors
///
/// Returns [`LogError`] if logging initialization fails.
fn setup_logging(
    verbose: u8,
    format: LogFormat,
    file_path: Option<PathBuf>,
) -> Result<LogGuard, LogError> {
    let config = LogConfig {
        level: verbosity_to_level(verbose),
        format,
        file_path,
        correlation_ids: true,
    };
    init_logging(&config)
}

/// Main entry point for the `sigil` binary.
fn main() {
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.verbose, cli.log_format, cli.log_file.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let config_path = cli.config;
    let result: Result<(), (String, i32)> = match cli.command {
        Commands::Init { force } => InitCommand::new(force)
            .run()
            .map_err(|e| (e.to_string(), EXIT_ERROR)),
        Commands::Config { action } => ConfigCommand::new(action, config_path)
            .run()
            .map_err(|e| (e.to_string(), EXIT_ERROR)),
        Commands::Chains => ChainsCommand::new(config_path)
            .run()
            .map_err(|e| (e.to_string(), EXIT_ERROR)),
        Commands::Address { command } => AddressCommand::new(command, config_path)
            .run()
            .map_err(|e| (e.to_string(), e.exit_code())),
        Commands::Encode {
            intent,
            chain,
            pubkey,
            format,
        } => EncodeCommand::new(intent, chain, pubkey, format, config_path)
            .run()
            .map_err(|e| (e.to_string(), e.exit_code())),
        Commands::Sign {
            intent,
            chain,
            no_broadcast,
            format,
        } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to create tokio runtime: {e}");
                    std::process::exit(EXIT_ERROR);
                }
            };
            let cmd = SignCommand::new(intent, chain, no_broadcast, format, config_path);
            rt.block_on(cmd.run())
                .map_err(|e| (e.to_string(), e.exit_code()))
        }
        Commands::Verify {
            chain,
            message,
            hex,
            signature,
            pubkey,
            address,
        } => VerifyCommand {
            chain,
            message,
            hex,
            signature,
            pubkey,
            address,
            config_path,
        }
        .run()
        .map_err(|e| (e.to_string(), e.exit_code())),
        Commands::Recover {
            typed_data,
            message,
            signature,
            expected,
        } => RecoverCommand {
            typed_data,
            message,
            signature,
            expected,
        }
        .run()
        .map_err(|e| (e.to_string(), e.exit_code())),
    };

    if let Err((message, code)) = result {
        eprintln!("Error: {message}");
        std::process::exit(code);
    }
}
