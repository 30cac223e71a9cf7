//! Sync command implementations.
//!
//! Status, queue listing, writes, manual sync, and the long-running watcher.

use colored::Colorize;

use crate::cli::args::{OutputFormat, WriteArgs};
use crate::error::StepsyncError;
use crate::output::{format_drain, format_outcome, format_queue, format_status};
use crate::sync::{DrainOutcome, Mutation, SyncService};

/// Show network state and queue summary.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or output formatting fails.
pub async fn status(service: &SyncService, format: OutputFormat) -> Result<String, StepsyncError> {
    service.refresh_connectivity().await;
    let status = service.status().await?;
    format_status(&status, format)
}

/// List pending operations.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or output formatting fails.
pub async fn list(service: &SyncService, format: OutputFormat) -> Result<String, StepsyncError> {
    let pending = service.pending().await?;
    format_queue(&pending, format)
}

/// Submit one write through the offline-aware wrapper.
///
/// # Errors
///
/// Returns an error for unknown operations or invalid payloads, a failed
/// online write, or a queue failure.
pub async fn write(
    service: &SyncService,
    args: WriteArgs,
    format: OutputFormat,
) -> Result<String, StepsyncError> {
    let mutation = Mutation::from_parts(&args.operation, &args.payload)?;
    let outcome = service.submit(mutation).await?;
    format_outcome(&outcome, format)
}

/// Replay the queue now.
///
/// # Errors
///
/// Returns an error if the queue store fails during the drain.
pub async fn sync(service: &SyncService, format: OutputFormat) -> Result<String, StepsyncError> {
    let outcome = service.sync_now().await?;
    format_drain(&outcome, format)
}

/// Run the monitor and triggers until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the interrupt handler cannot be installed.
pub async fn watch(service: &mut SyncService, format: OutputFormat) -> Result<String, StepsyncError> {
    service.start().await;
    let Some(mut drains) = service.subscribe_drains() else {
        return Ok(String::new());
    };

    if format == OutputFormat::Pretty {
        eprintln!("{}", "Watching for connectivity changes (Ctrl-C to stop)".dimmed());
    }

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(StepsyncError::from),
            event = drains.recv() => match event {
                Ok(event) => match event.outcome {
                    Ok(DrainOutcome::Completed { report }) if report.total() > 0 => {
                        println!("{}", format_drain(&DrainOutcome::Completed { report }, format)?);
                    },
                    Ok(outcome) => {
                        tracing::debug!(trigger = %event.trigger, ?outcome, "drain produced no work");
                    },
                    Err(e) => eprintln!("{}: {e}", "sync failed".red()),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed drain events");
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break Ok(()),
            },
        }
    };

    service.shutdown().await;
    result?;
    Ok(String::new())
}
