//! Reading and writing `~/.sigil/config.toml`.
//!
//! A missing file is not an error for [`ConfigLoader::load`]: the built-in
//! defaults apply. Every loaded file is validated before it is returned.
//!
//! # Examples
//!
//! ```no_run
//! use sigil_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("home directory");
//! if !loader.exists() {
//!     loader.write_default().expect("write default config");
//! }
//! let config = loader.load().expect("load config");
//! println!("retrying {} times", config.resolver.max_attempts);
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

const BASE_DIR_NAME: &str = ".sigil";

/// Loads and stores the Sigil configuration file under a base directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader rooted at `~/.sigil`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            base_dir: default_base_dir()?,
        })
    }

    /// Creates a loader rooted at a custom directory.
    ///
    /// ```
    /// use sigil_core::config_loader::ConfigLoader;
    /// use std::path::PathBuf;
    ///
    /// let loader = ConfigLoader::with_base_dir(PathBuf::from("/etc/sigil"));
    /// assert_eq!(loader.config_path(), PathBuf::from("/etc/sigil/config.toml"));
    /// ```
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Path of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads the configuration, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] for invalid TOML,
    /// [`ConfigError::InvalidValue`] if validation fails, and
    /// [`ConfigError::Io`] if the file cannot be read.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        load_from_file(&path)
    }

    /// Loads the configuration, failing when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the file does not exist, plus
    /// everything [`load`](Self::load) can return.
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()));
        }
        load_from_file(&path)
    }

    /// Serializes `config` to the configuration file, creating the base
    /// directory when needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` does not validate,
    /// [`ConfigError::ParseFailed`] if it cannot be serialized, and
    /// [`ConfigError::Io`] on write failures.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.ensure_base_dir()?;

        let path = self.config_path();
        let toml_str = toml::to_string_pretty(config).map_err(|e| {
            ConfigError::parse_failed(format!("failed to serialize configuration: {e}"))
        })?;

        fs::write(&path, toml_str)
            .map_err(|e| ConfigError::io(format!("failed to write {}", path.display()), e))
    }

    /// Writes the commented default configuration from [`Config::default_toml`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on write failures.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;

        let path = self.config_path();
        fs::write(&path, Config::default_toml())
            .map_err(|e| ConfigError::io(format!("failed to write {}", path.display()), e))
    }

    /// Returns `true` if the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        if self.base_dir.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            ConfigError::io(
                format!("failed to create {}", self.base_dir.display()),
                e,
            )
        })
    }
}

/// Loads and validates a configuration file at an explicit path.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`], [`ConfigError::Io`],
/// [`ConfigError::ParseFailed`] or [`ConfigError::InvalidValue`].
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::file_not_found(path.display().to_string()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::io(format!("failed to read {}", path.display()), e))?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
///
/// ```
/// use sigil_core::config_loader::expand_path;
///
/// let path = expand_path("/etc/sigil/config.toml").expect("absolute path");
/// assert_eq!(path.to_string_lossy(), "/etc/sigil/config.toml");
/// ```
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix('~') {
        Some("") => dirs::home_dir().ok_or_else(ConfigError::no_home_directory),
        Some(rest) if rest.starts_with('/') => {
            let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
            Ok(home.join(rest.trim_start_matches('/')))
        }
        _ => Ok(PathBuf::from(path)),
    }
}

/// Returns `~/.sigil`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
    Ok(home.join(BASE_DIR_NAME))
}

/// Loads `~/.sigil/config.toml`, or defaults when it does not exist.
///
/// # Errors
///
/// See [`ConfigLoader::new`] and [`ConfigLoader::load`].
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new()?.load()
}
