//! # Chains Command
//!
//! `sigil chains` lists the built-in chains merged with the `[[chains]]`
//! entries of the configuration.

use std::path::PathBuf;

use sigil_chain::ChainRegistry;
use sigil_core::error::ConfigError;
use sigil_core::types::ChainDescriptor;

/// Errors that can occur while listing chains.
#[derive(Debug, thiserror::Error)]
pub enum ChainsCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),
}

/// The `sigil chains` command handler.
#[derive(Debug, Clone)]
pub struct ChainsCommand {
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl ChainsCommand {
    /// Create a new `ChainsCommand`.
    #[must_use]
    pub const fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Prints one line per chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainsCommandError::LoadError`] if the configuration is invalid.
    pub fn run(&self) -> Result<(), ChainsCommandError> {
        let config = super::load_config(self.config_path.as_deref())?;
        let registry = ChainRegistry::with_config(&config);
        for line in render(&registry) {
            println!("{line}");
        }
        Ok(())
    }
}

/// One line per chain, sorted by chain id.
#[must_use]
pub fn render(registry: &ChainRegistry) -> Vec<String> {
    registry
        .supported_chains()
        .into_iter()
        .filter_map(|id| registry.get(id))
        .map(render_chain)
        .collect()
}

fn render_chain(chain: &ChainDescriptor) -> String {
    let evm = chain
        .evm_chain_id
        .map(|id| format!(" evm_chain_id={id}"))
        .unwrap_or_default();
    format!(
        "{:<16} {:<14} prefix={:<8} fee={}{}",
        chain.chain_id,
        chain.family.as_str(),
        chain.bech32_prefix,
        chain.fee_currency.minimal_denom,
        evm
    )
}
