//! Path resolution for stepsync configuration and data files.
//!
//! All stepsync data is stored in `~/.stepsync/` (or `$STEPSYNC_HOME`):
//! - `config.yaml` - Main configuration file
//! - `queue.db` - SQLite database holding the offline queue

use std::path::PathBuf;

use crate::error::StepsyncError;

/// Environment variable that overrides the data root.
pub const HOME_ENV: &str = "STEPSYNC_HOME";

/// Paths to stepsync configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.stepsync/`
    pub root: PathBuf,
    /// Config file: `~/.stepsync/config.yaml`
    pub config_file: PathBuf,
    /// Queue database: `~/.stepsync/queue.db`
    pub database: PathBuf,
}

impl Paths {
    /// Resolve paths from `$STEPSYNC_HOME`, falling back to `$HOME/.stepsync`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, StepsyncError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            if !root.is_empty() {
                return Ok(Self::with_root(PathBuf::from(root)));
            }
        }

        let home = std::env::var("HOME").map_err(|_| {
            StepsyncError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".stepsync")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("queue.db"),
            root,
        }
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), StepsyncError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                StepsyncError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}
