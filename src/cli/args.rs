use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::config::HOME_ENV;

#[derive(Parser)]
#[command(name = "stepsync")]
#[command(about = "Offline-first sync queue for recovery journal, check-in, and step work writes")]
#[command(long_about = "stepsync - offline-first sync for a recovery-tracking client

Writes made while offline are saved to a durable local queue and replayed
against the hosted API, in the order they were made, once the network
returns.

QUICK START:
  stepsync status                                   Network and queue summary
  stepsync write dailyEntry.upsert --payload '{\"gratitude\":\"sunrise\"}'
  stepsync list                                     Pending operations
  stepsync sync                                     Replay the queue now
  stepsync watch                                    Sync automatically until Ctrl-C

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  stepsync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,

    /// Data directory holding config.yaml and queue.db
    #[arg(long, env = HOME_ENV, global = true)]
    pub home: Option<PathBuf>,

    /// Log filter (e.g. "debug" or "stepsync=trace"); RUST_LOG wins if set
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show network state and queue summary
    ///
    /// Runs a fresh connectivity check, then reports the number of pending
    /// operations, the oldest one, and how many have failed before.
    ///
    /// # Examples
    ///
    ///   stepsync status
    ///   stepsync status -o json
    #[command(alias = "st")]
    Status,

    /// List pending operations, oldest first
    ///
    /// Shows each queued operation with its id, type, age, retry count,
    /// and the most recent replay error.
    #[command(alias = "ls")]
    List,

    /// Submit one write
    ///
    /// When the API is reachable the write is sent immediately. Otherwise
    /// it is queued and replayed later.
    ///
    /// # Operations
    ///
    ///   journal.create  journal.update  journal.delete
    ///   dailyEntry.upsert  stepEntry.upsert
    ///   routine.create  routine.update  routine.delete
    ///   profile.update
    ///
    /// # Examples
    ///
    ///   stepsync write journal.create --payload '{"content":"Day 12"}'
    ///   stepsync write stepEntry.upsert --payload '{"step_number":4,"question_index":2,"answer":"..."}'
    Write(WriteArgs),

    /// Replay pending operations now
    ///
    /// Checks connectivity, then replays the queue in order. Failed
    /// operations stay queued for the next sync.
    Sync,

    /// Keep syncing until interrupted
    ///
    /// Polls connectivity and replays the queue whenever the network comes
    /// back. Stop with Ctrl-C.
    Watch,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   stepsync completions bash > /usr/local/etc/bash_completion.d/stepsync
    ///   stepsync completions zsh > ~/.zsh/completions/_stepsync
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct WriteArgs {
    /// Operation identifier (e.g. journal.create)
    pub operation: String,

    /// Operation payload as JSON
    #[arg(long, short = 'p', default_value = "{}")]
    pub payload: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default config.yaml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_status_command() {
        let cli = Cli::try_parse_from(["stepsync", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.output, OutputFormat::Pretty);
    }

    #[test]
    fn test_cli_list_alias() {
        let cli = Cli::try_parse_from(["stepsync", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_cli_write_command() {
        let cli = Cli::try_parse_from([
            "stepsync",
            "write",
            "dailyEntry.upsert",
            "--payload",
            r#"{"gratitude":"sunrise"}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Write(args) => {
                assert_eq!(args.operation, "dailyEntry.upsert");
                assert_eq!(args.payload, r#"{"gratitude":"sunrise"}"#);
            },
            _ => panic!("expected write"),
        }
    }

    #[test]
    fn test_cli_write_default_payload() {
        let cli = Cli::try_parse_from(["stepsync", "write", "profile.update"]).unwrap();
        match cli.command {
            Commands::Write(args) => assert_eq!(args.payload, "{}"),
            _ => panic!("expected write"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stepsync", "sync", "-o", "json", "--home", "/tmp/x", "--log", "debug",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Sync));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.log.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_config_init_force() {
        let cli = Cli::try_parse_from(["stepsync", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                command: ConfigCommands::Init { force: true }
            })
        ));
    }

    #[test]
    fn test_cli_completions_shell() {
        let cli = Cli::try_parse_from(["stepsync", "completions", "zsh"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Zsh }));
    }

    #[test]
    fn test_cli_rejects_unknown_output() {
        assert!(Cli::try_parse_from(["stepsync", "-o", "xml", "status"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
