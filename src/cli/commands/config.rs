//! Configuration command implementation.

use colored::Colorize;

use crate::cli::args::{ConfigCommands, OutputFormat};
use crate::config::{Config, Paths};
use crate::error::StepsyncError;
use crate::output::to_json;

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn config(
    paths: &Paths,
    config: &Config,
    cmd: ConfigCommands,
    format: OutputFormat,
) -> Result<String, StepsyncError> {
    match cmd {
        ConfigCommands::Show => show(paths, &redacted(config), format),
        ConfigCommands::Init { force } => init(paths, force, format),
    }
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.remote.api_key.is_some() {
        config.remote.api_key = Some("********".to_string());
    }
    config
}

fn show(paths: &Paths, config: &Config, format: OutputFormat) -> Result<String, StepsyncError> {
    match format {
        OutputFormat::Json => to_json(config),
        OutputFormat::Pretty => {
            let mut output = format!(
                "{} {}\n",
                "Config:".bold(),
                paths.config_file.display().to_string().dimmed()
            );
            output.push_str(&"─".repeat(40));
            output.push('\n');
            output.push_str(&config.to_yaml()?);
            Ok(output)
        },
    }
}

fn init(paths: &Paths, force: bool, format: OutputFormat) -> Result<String, StepsyncError> {
    if paths.config_file.exists() && !force {
        return Err(StepsyncError::Config(format!(
            "{} already exists (use --force to overwrite)",
            paths.config_file.display()
        )));
    }

    paths.ensure_dirs()?;
    Config::default().save_to_path(&paths.config_file)?;
    tracing::info!(path = %paths.config_file.display(), "wrote default config");

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "path": paths.config_file.display().to_string(),
        })),
        OutputFormat::Pretty => Ok(format!(
            "{} Wrote {}",
            "✓".green(),
            paths.config_file.display()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().join("data"));

        let output = config(
            &paths,
            &Config::default(),
            ConfigCommands::Init { force: false },
            OutputFormat::Pretty,
        )
        .unwrap();

        assert!(output.contains("Wrote"));
        let loaded = Config::load_from_path(&paths.config_file).unwrap();
        assert_eq!(loaded.remote.base_url, Config::default().remote.base_url);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().to_path_buf());
        let cmd = || ConfigCommands::Init { force: false };

        config(&paths, &Config::default(), cmd(), OutputFormat::Pretty).unwrap();
        let err = config(&paths, &Config::default(), cmd(), OutputFormat::Pretty).unwrap_err();
        assert!(matches!(err, StepsyncError::Config(_)));

        config(
            &paths,
            &Config::default(),
            ConfigCommands::Init { force: true },
            OutputFormat::Pretty,
        )
        .unwrap();
    }

    #[test]
    fn test_show_json() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().to_path_buf());

        let output = config(&paths, &Config::default(), ConfigCommands::Show, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["connectivity"]["poll_interval_secs"], 5);
    }

    #[test]
    fn test_show_redacts_api_key() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().to_path_buf());
        let mut cfg = Config::default();
        cfg.remote.api_key = Some("secret-token".to_string());

        let output = config(&paths, &cfg, ConfigCommands::Show, OutputFormat::Pretty).unwrap();
        assert!(!output.contains("secret-token"));
        assert!(output.contains("********"));
    }
}
