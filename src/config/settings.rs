//! Configuration settings for stepsync.
//!
//! Settings are loaded from `~/.stepsync/config.yaml`. Every section is
//! optional; missing fields fall back to their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StepsyncError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Remote service settings.
    pub remote: RemoteConfig,
    /// Reachability monitor settings.
    pub connectivity: ConnectivityConfig,
    /// Replay settings.
    pub sync: SyncConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the hosted API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Reachability monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Seconds between reachability polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Timeout for a single reachability probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

/// Replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Stop replaying an item after this many failed attempts.
    ///
    /// Unset means items are retried on every drain forever.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Run a drain as soon as the lifecycle loop starts.
    #[serde(default = "default_true")]
    pub drain_on_start: bool,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions for serde
fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_probe_timeout() -> u64 {
    3
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            drain_on_start: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RemoteConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ConnectivityConfig {
    /// Poll interval as a `Duration`, never shorter than one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Probe timeout as a `Duration`.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, StepsyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            StepsyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            StepsyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), StepsyncError> {
        let contents = self.to_yaml()?;

        std::fs::write(path, contents).map_err(|e| {
            StepsyncError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Render the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, StepsyncError> {
        serde_yaml::to_string(self)
            .map_err(|e| StepsyncError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Reject settings the sync subsystem cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<(), StepsyncError> {
        let base = self.remote.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(StepsyncError::Config(format!(
                "remote.base_url must be an http(s) URL, got '{base}'"
            )));
        }
        if self.remote.timeout_secs == 0 {
            return Err(StepsyncError::Config(
                "remote.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.connectivity.probe_timeout_secs == 0 {
            return Err(StepsyncError::Config(
                "connectivity.probe_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.remote.base_url, "http://localhost:54321");
        assert!(config.remote.api_key.is_none());
        assert_eq!(config.connectivity.poll_interval_secs, 5);
        assert_eq!(config.sync.max_retries, None);
        assert!(config.sync.drain_on_start);
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.connectivity.poll_interval_secs, 5);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.remote.base_url = "https://api.example.org".to_string();
        config.sync.max_retries = Some(10);

        config.save_to_path(&config_path).unwrap();
        let loaded = Config::load_from_path(&config_path).unwrap();

        assert_eq!(loaded.remote.base_url, "https://api.example.org");
        assert_eq!(loaded.sync.max_retries, Some(10));
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r"
connectivity:
  poll_interval_secs: 15
";
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.connectivity.poll_interval_secs, 15);
        assert_eq!(config.connectivity.probe_timeout_secs, 3);
        assert_eq!(config.remote.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "remote:\n  base_url: ftp://nope\n").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, StepsyncError::Config(_)));
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = ConnectivityConfig {
            poll_interval_secs: 0,
            probe_timeout_secs: 3,
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
