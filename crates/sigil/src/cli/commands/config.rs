//! # Config Command
//!
//! ```text
//! sigil config           # Display the effective configuration
//! sigil config path      # Show the configuration file path
//! ```

use std::path::PathBuf;

use sigil_core::config::Config;
use sigil_core::config_loader::ConfigLoader;
use sigil_core::error::ConfigError;

use crate::cli::args::ConfigAction;

/// Errors that can occur during config command execution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigCommandError {
    /// Failed to load configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// The configuration could not be rendered.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// The `sigil config` command handler.
#[derive(Debug, Clone)]
pub struct ConfigCommand {
    /// The action to perform (None = show config).
    pub action: Option<ConfigAction>,
    /// Explicit config file, from `--config`.
    pub config_path: Option<PathBuf>,
}

impl ConfigCommand {
    /// Create a new `ConfigCommand`.
    #[must_use]
    pub const fn new(action: Option<ConfigAction>, config_path: Option<PathBuf>) -> Self {
        Self {
            action,
            config_path,
        }
    }

    /// Run the config command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or rendered.
    pub fn run(&self) -> Result<(), ConfigCommandError> {
        match &self.action {
            None => {
                let config = super::load_config(self.config_path.as_deref())?;
                println!("{}", format_toml_output(&config)?);
            }
            Some(ConfigAction::Path) => {
                println!("{}", self.resolved_path()?.display());
            }
        }
        Ok(())
    }

    /// The file `sigil` reads its configuration from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigCommandError::LoadError`] if no home directory exists.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigCommandError> {
        match self.config_path.as_deref() {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(ConfigLoader::new()?.config_path()),
        }
    }
}

/// Format the configuration as pretty TOML.
///
/// # Errors
///
/// Returns [`ConfigCommandError::Serialize`] if TOML serialization fails.
pub fn format_toml_output(config: &Config) -> Result<String, ConfigCommandError> {
    toml::to_string_pretty(config).map_err(|e| ConfigCommandError::Serialize(e.to_string()))
}
