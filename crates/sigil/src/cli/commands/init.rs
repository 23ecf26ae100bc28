//! # Init Command
//!
//! `sigil init` writes the commented default configuration:
//!
//! ```text
//! ~/.sigil/
//! └── config.toml
//! ```

use std::path::{Path, PathBuf};

use sigil_core::config_loader::ConfigLoader;
use sigil_core::error::ConfigError;

/// Errors that can occur during initialization.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A configuration exists and --force was not given.
    #[error("Sigil is already initialized at {0}. Use --force to overwrite.")]
    AlreadyInitialized(String),

    /// The configuration could not be written.
    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] ConfigError),
}

/// The `sigil init` command handler.
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration.
    pub force: bool,
}

impl InitCommand {
    /// Create a new `InitCommand`.
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self { force }
    }

    /// Writes `~/.sigil/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::AlreadyInitialized`] unless forced, or
    /// [`InitError::ConfigWrite`] if the file cannot be written.
    pub fn run(&self) -> Result<(), InitError> {
        let loader = ConfigLoader::new()?;
        let path = self.init_with(&loader)?;
        print_success_message(&path);
        Ok(())
    }

    /// Same as [`run`](Self::run) under `base_dir`, without printing.
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<PathBuf, InitError> {
        self.init_with(&ConfigLoader::with_base_dir(base_dir.to_path_buf()))
    }

    fn init_with(&self, loader: &ConfigLoader) -> Result<PathBuf, InitError> {
        let path = loader.config_path();
        if loader.exists() && !self.force {
            return Err(InitError::AlreadyInitialized(path.display().to_string()));
        }
        loader.write_default()?;
        tracing::info!(path = %path.display(), "wrote default configuration");
        Ok(path)
    }
}

fn print_success_message(path: &Path) {
    println!("Sigil initialized.");
    println!();
    println!("  Config: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  sigil chains            # list known chains");
    println!("  sigil config            # show the effective configuration");
}
