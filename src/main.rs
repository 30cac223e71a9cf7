use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use stepsync::cli::args::{Cli, Commands};
use stepsync::cli::commands;
use stepsync::config::{Config, Paths};
use stepsync::error::StepsyncError;
use stepsync::SyncService;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = match &cli.home {
        Some(root) => Paths::with_root(root.clone()),
        None => Paths::new()?,
    };
    let config = Config::load_from_path(&paths.config_file)
        .with_context(|| format!("loading {}", paths.config_file.display()))?;
    init_logging(cli.log.as_deref(), &config.logging.level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let output = runtime.block_on(execute(cli, &paths, &config))?;

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

async fn execute(cli: Cli, paths: &Paths, config: &Config) -> Result<String, StepsyncError> {
    let format = cli.output;

    match cli.command {
        Commands::Completions { shell } => commands::completions(shell),
        Commands::Config(args) => commands::config(paths, config, args.command, format),
        Commands::Status => commands::status(&SyncService::open(config, paths)?, format).await,
        Commands::List => commands::list(&SyncService::open(config, paths)?, format).await,
        Commands::Write(args) => {
            commands::write(&SyncService::open(config, paths)?, args, format).await
        },
        Commands::Sync => commands::sync(&SyncService::open(config, paths)?, format).await,
        Commands::Watch => {
            let mut service = SyncService::open(config, paths)?;
            commands::watch(&mut service, format).await
        },
    }
}

/// `RUST_LOG` wins, then `--log`, then `logging.level` from config.
fn init_logging(flag: Option<&str>, configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(flag.unwrap_or(configured)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
