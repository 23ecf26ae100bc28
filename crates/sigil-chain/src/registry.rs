//! Read-only chain registry.
//!
//! The registry maps chain ids to [`ChainDescriptor`]s. It is built once
//! (built-in chains, optionally merged with `[[chains]]` from the config
//! file) and then shared across requests; clones are cheap.
//!
//! # Example
//!
//! ```
//! use sigil_chain::ChainRegistry;
//!
//! let registry = ChainRegistry::new();
//! assert!(registry.supports("osmosis-1"));
//!
//! let chain = registry.resolve("evmos_9001-2").expect("built-in chain");
//! assert_eq!(chain.evm_chain_id, Some(9001));
//! assert!(registry.resolve("unknown-1").is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use sigil_core::config::Config;
use sigil_core::error::SigilError;
use sigil_core::types::{ChainDescriptor, Currency};

/// Registry of known chains, keyed by chain id.
#[derive(Clone)]
pub struct ChainRegistry {
    chains: Arc<HashMap<String, ChainDescriptor>>,
}

impl ChainRegistry {
    /// Creates a registry with the built-in chains:
    /// - `cosmoshub-4` (`cosmos`, `uatom`)
    /// - `osmosis-1` (`osmo`, `uosmo`)
    /// - `evmos_9001-2` (`evmos`, `aevmos`, EVM chain id 9001)
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for chain in builtin_chains() {
            registry.register(chain);
        }
        registry
    }

    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            chains: Arc::new(HashMap::new()),
        }
    }

    /// Built-in chains overlaid with the chains declared in `config`.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for chain in &config.chains {
            registry.register(chain.clone());
        }
        registry
    }

    /// Registers a chain, replacing any chain with the same id.
    pub fn register(&mut self, chain: ChainDescriptor) {
        Arc::make_mut(&mut self.chains).insert(chain.chain_id.clone(), chain);
    }

    /// Looks up a chain.
    #[must_use]
    pub fn get(&self, chain_id: &str) -> Option<&ChainDescriptor> {
        self.chains.get(chain_id)
    }

    /// Looks up a chain, failing with [`SigilError::UnknownChain`].
    ///
    /// # Errors
    ///
    /// Returns [`SigilError::UnknownChain`] if `chain_id` is not registered.
    pub fn resolve(&self, chain_id: &str) -> Result<&ChainDescriptor, SigilError> {
        self.get(chain_id)
            .ok_or_else(|| SigilError::unknown_chain(chain_id))
    }

    /// Sorted list of registered chain ids.
    #[must_use]
    pub fn supported_chains(&self) -> Vec<&str> {
        let mut chains: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        chains.sort_unstable();
        chains
    }

    /// Returns `true` if `chain_id` is registered.
    #[must_use]
    pub fn supports(&self, chain_id: &str) -> bool {
        self.chains.contains_key(chain_id)
    }

    /// Number of registered chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns `true` if no chain is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.supported_chains())
            .finish()
    }
}

fn builtin_chains() -> Vec<ChainDescriptor> {
    vec![
        ChainDescriptor::cosmos("cosmoshub-4", "cosmos", Currency::new("ATOM", "uatom", 6))
            .with_rest_endpoint("https://lcd-cosmoshub.keplr.app"),
        ChainDescriptor::cosmos("osmosis-1", "osmo", Currency::new("OSMO", "uosmo", 6))
            .with_rest_endpoint("https://lcd-osmosis.keplr.app"),
        ChainDescriptor::evm(
            "evmos_9001-2",
            "evmos",
            Currency::new("EVMOS", "aevmos", 18),
            9001,
        )
        .with_rest_endpoint("https://lcd-evmos.keplr.app")
        .with_evm_rpc_endpoint("https://evm-evmos.keplr.app"),
    ]
}
