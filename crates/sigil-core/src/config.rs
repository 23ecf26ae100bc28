//! Configuration types for the Sigil signing core.
//!
//! This module provides the configuration structures that tune the resolver
//! retry policy, the broadcast behavior, and extra chain registrations.
//!
//! # Configuration File
//!
//! Configuration is stored in TOML format at `~/.sigil/config.toml`.
//!
//! # Examples
//!
//! ```
//! use sigil_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.resolver.max_attempts, 10);
//! assert_eq!(config.resolver.retry_interval_ms, 100);
//!
//! let toml_str = Config::default_toml();
//! assert!(toml_str.contains("[resolver]"));
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [resolver]
//! max_attempts = 10
//! retry_interval_ms = 100
//! request_timeout_secs = 30
//!
//! [broadcast]
//! enabled = true
//! cosmos_mode = "block"
//! evm_mode = "sync"
//! ```

use crate::error::ConfigError;
use crate::types::{BroadcastMode, ChainDescriptor, ChainFamily};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Top-level configuration.
///
/// - **Resolver**: account polling retry policy and request timeout
/// - **Broadcast**: whether signed transactions are broadcast, and how
/// - **Chains**: chain descriptors merged over the built-in registry
///
/// # Examples
///
/// ```
/// use sigil_core::config::Config;
///
/// let toml_str = r#"
/// [resolver]
/// max_attempts = 5
///
/// [[chains]]
/// chain_id = "juno-1"
/// family = "cosmos-sdk"
/// bech32_prefix = "juno"
/// rest_endpoint = "https://lcd.juno.example"
///
/// [chains.fee_currency]
/// denom = "JUNO"
/// minimal_denom = "ujuno"
/// decimals = 6
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.resolver.max_attempts, 5);
/// assert_eq!(config.chains.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Fee and nonce resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Broadcast settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Additional or overriding chain descriptors.
    #[serde(default)]
    pub chains: Vec<ChainDescriptor>,
}

/// Returns the default number of account polling attempts.
#[must_use]
const fn default_max_attempts() -> u32 {
    10
}

/// Returns the default delay between account polling attempts.
#[must_use]
const fn default_retry_interval_ms() -> u64 {
    100
}

/// Returns the default HTTP request timeout in seconds.
#[must_use]
const fn default_request_timeout() -> u64 {
    30
}

/// Fee and nonce resolver configuration.
///
/// A freshly created account may not be visible on chain yet. The resolver
/// polls for it at a fixed interval and gives up after `max_attempts`.
///
/// # Examples
///
/// ```
/// use sigil_core::config::ResolverConfig;
/// use std::time::Duration;
///
/// let config = ResolverConfig::default();
/// assert_eq!(config.retry_interval(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Total attempts before `AccountNotReady` becomes terminal.
    ///
    /// Default: 10
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    ///
    /// Default: 100
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Timeout for each provider HTTP request in seconds.
    ///
    /// Default: 30
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ResolverConfig {
    /// Returns the retry interval as a [`Duration`].
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_interval_ms: default_retry_interval_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

const fn default_broadcast_enabled() -> bool {
    true
}

const fn default_cosmos_mode() -> BroadcastMode {
    BroadcastMode::Block
}

const fn default_evm_mode() -> BroadcastMode {
    BroadcastMode::Sync
}

/// Broadcast configuration.
///
/// Broadcasting is a single best-effort attempt; failures are reported and
/// never retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Whether signed transactions are broadcast at all.
    ///
    /// Default: `true`
    #[serde(default = "default_broadcast_enabled")]
    pub enabled: bool,

    /// Mode used for Cosmos SDK transactions.
    ///
    /// Default: `block`
    #[serde(default = "default_cosmos_mode")]
    pub cosmos_mode: BroadcastMode,

    /// Mode used for EVM transactions. `block` is treated as `sync`.
    ///
    /// Default: `sync`
    #[serde(default = "default_evm_mode")]
    pub evm_mode: BroadcastMode,
}

impl BroadcastConfig {
    /// Returns the configured mode for a chain family.
    #[must_use]
    pub const fn mode_for(&self, family: ChainFamily) -> BroadcastMode {
        match family {
            ChainFamily::CosmosSdk => self.cosmos_mode,
            ChainFamily::EvmCompatible => self.evm_mode,
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: default_broadcast_enabled(),
            cosmos_mode: default_cosmos_mode(),
            evm_mode: default_evm_mode(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `resolver.max_attempts` is zero
    /// - `resolver.request_timeout_secs` is zero
    /// - a chain has an empty `chain_id` or `bech32_prefix`
    /// - a chain id appears twice
    /// - an EVM-compatible chain has no `evm_chain_id`
    ///
    /// # Examples
    ///
    /// ```
    /// use sigil_core::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.resolver.max_attempts = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.max_attempts == 0 {
            return Err(ConfigError::invalid_value("resolver.max_attempts", "0"));
        }

        if self.resolver.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "resolver.request_timeout_secs",
                "0",
            ));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if chain.chain_id.is_empty() {
                return Err(ConfigError::invalid_value("chains.chain_id", "<empty>"));
            }
            if chain.bech32_prefix.is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("chains[{}].bech32_prefix", chain.chain_id),
                    "<empty>",
                ));
            }
            if chain.family.is_evm() && chain.evm_chain_id.is_none() {
                return Err(ConfigError::invalid_value(
                    format!("chains[{}].evm_chain_id", chain.chain_id),
                    "<missing>",
                ));
            }
            if !seen.insert(chain.chain_id.as_str()) {
                return Err(ConfigError::invalid_value(
                    "chains.chain_id",
                    format!("duplicate {}", chain.chain_id),
                ));
            }
        }

        Ok(())
    }

    /// Generates the default configuration as a TOML string, with a
    /// commented-out chain entry as a template.
    #[must_use]
    pub fn default_toml() -> String {
        r#"[resolver]
max_attempts = 10
retry_interval_ms = 100
request_timeout_secs = 30

[broadcast]
enabled = true
cosmos_mode = "block"
evm_mode = "sync"

# [[chains]]
# chain_id = "juno-1"
# family = "cosmos-sdk"
# bech32_prefix = "juno"
# rest_endpoint = "https://lcd.juno.example"
#
# [chains.fee_currency]
# denom = "JUNO"
# minimal_denom = "ujuno"
# decimals = 6
"#
        .to_string()
    }

    /// Creates a configuration builder for customizing values.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigil_core::config::Config;
    ///
    /// let config = Config::builder()
    ///     .max_attempts(3)
    ///     .retry_interval_ms(250)
    ///     .build();
    ///
    /// assert_eq!(config.resolver.max_attempts, 3);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for creating customized [`Config`] instances.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the maximum number of account polling attempts.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.resolver.max_attempts = attempts;
        self
    }

    /// Sets the delay between polling attempts in milliseconds.
    #[must_use]
    pub const fn retry_interval_ms(mut self, ms: u64) -> Self {
        self.config.resolver.retry_interval_ms = ms;
        self
    }

    /// Sets the provider request timeout in seconds.
    #[must_use]
    pub const fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.resolver.request_timeout_secs = secs;
        self
    }

    /// Enables or disables broadcasting.
    #[must_use]
    pub const fn broadcast_enabled(mut self, enabled: bool) -> Self {
        self.config.broadcast.enabled = enabled;
        self
    }

    /// Sets the Cosmos broadcast mode.
    #[must_use]
    pub const fn cosmos_mode(mut self, mode: BroadcastMode) -> Self {
        self.config.broadcast.cosmos_mode = mode;
        self
    }

    /// Adds a chain descriptor.
    #[must_use]
    pub fn chain(mut self, chain: ChainDescriptor) -> Self {
        self.config.chains.push(chain);
        self
    }

    /// Builds the final configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::indexing_slicing,
        clippy::needless_raw_string_hashes
    )]

    use super::*;
    use crate::types::Currency;

    fn juno() -> ChainDescriptor {
        ChainDescriptor::cosmos("juno-1", "juno", Currency::new("JUNO", "ujuno", 6))
    }

    // -------------------------------------------------------------------------
    // Defaults
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.resolver.max_attempts, 10);
        assert_eq!(config.resolver.retry_interval_ms, 100);
        assert_eq!(config.resolver.request_timeout_secs, 30);
        assert!(config.broadcast.enabled);
        assert_eq!(config.broadcast.cosmos_mode, BroadcastMode::Block);
        assert_eq!(config.broadcast.evm_mode, BroadcastMode::Sync);
        assert!(config.chains.is_empty());
    }

    #[test]
    fn test_mode_for_family() {
        let config = BroadcastConfig::default();
        assert_eq!(config.mode_for(ChainFamily::CosmosSdk), BroadcastMode::Block);
        assert_eq!(
            config.mode_for(ChainFamily::EvmCompatible),
            BroadcastMode::Sync
        );
    }

    #[test]
    fn test_durations() {
        let config = ResolverConfig::default();
        assert_eq!(config.retry_interval(), Duration::from_millis(100));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_passes_for_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_fails_for_zero_attempts() {
        let config = Config::builder().max_attempts(0).build();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "resolver.max_attempts"
        ));
    }

    #[test]
    fn test_validate_fails_for_zero_timeout() {
        let config = Config::builder().request_timeout_secs(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_fails_for_duplicate_chain() {
        let config = Config::builder().chain(juno()).chain(juno()).build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate juno-1"));
    }

    #[test]
    fn test_validate_fails_for_evm_chain_without_numeric_id() {
        let mut chain = juno();
        chain.family = ChainFamily::EvmCompatible;
        let config = Config::builder().chain(chain).build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("evm_chain_id"));
    }

    #[test]
    fn test_validate_fails_for_empty_prefix() {
        let mut chain = juno();
        chain.bech32_prefix.clear();
        let config = Config::builder().chain(chain).build();
        assert!(config.validate().is_err());
    }

    // -------------------------------------------------------------------------
    // TOML
    // -------------------------------------------------------------------------

    #[test]
    fn test_toml_serialization_roundtrip() {
        let original = Config::builder().chain(juno()).max_attempts(4).build();

        let toml_str = toml::to_string(&original).expect("TOML serialization failed");
        let deserialized: Config = toml::from_str(&toml_str).expect("TOML deserialization failed");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_toml_deserialization_empty_config() {
        let config: Config = toml::from_str("").expect("TOML deserialization failed");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_deserialization_partial_sections() {
        let toml_str = r#"
            [resolver]
            retry_interval_ms = 500

            [broadcast]
            cosmos_mode = "sync"
        "#;

        let config: Config = toml::from_str(toml_str).expect("TOML deserialization failed");

        assert_eq!(config.resolver.max_attempts, 10);
        assert_eq!(config.resolver.retry_interval_ms, 500);
        assert!(config.broadcast.enabled);
        assert_eq!(config.broadcast.cosmos_mode, BroadcastMode::Sync);
    }

    #[test]
    fn test_default_toml_is_parseable() {
        let config: Config =
            toml::from_str(&Config::default_toml()).expect("default TOML should be parseable");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder_default() {
        assert_eq!(ConfigBuilder::new().build(), Config::default());
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::builder()
            .max_attempts(3)
            .retry_interval_ms(20)
            .request_timeout_secs(5)
            .broadcast_enabled(false)
            .cosmos_mode(BroadcastMode::Async)
            .chain(juno())
            .build();

        assert_eq!(config.resolver.max_attempts, 3);
        assert_eq!(config.resolver.retry_interval_ms, 20);
        assert_eq!(config.resolver.request_timeout_secs, 5);
        assert!(!config.broadcast.enabled);
        assert_eq!(config.broadcast.cosmos_mode, BroadcastMode::Async);
        assert_eq!(config.chains[0].chain_id, "juno-1");
    }
}
