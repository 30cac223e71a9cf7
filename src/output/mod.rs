//! Output formatting for stepsync.
//!
//! This module renders sync status, the pending queue, and write results as
//! colored text or JSON.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::StepsyncError;
use crate::sync::{format_drain_outcome, DrainOutcome, MutationOutcome, QueueItem, SyncStatus};

pub use json::*;
pub use pretty::*;

/// Format sync status based on output format
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_status(status: &SyncStatus, format: OutputFormat) -> Result<String, StepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(status)),
        OutputFormat::Json => format_status_json(status),
    }
}

/// Format the pending queue based on output format
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_queue(items: &[QueueItem], format: OutputFormat) -> Result<String, StepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_queue_pretty(items)),
        OutputFormat::Json => format_queue_json(items),
    }
}

/// Format a write result based on output format
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_outcome(outcome: &MutationOutcome, format: OutputFormat) -> Result<String, StepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_outcome_pretty(outcome)),
        OutputFormat::Json => to_json(outcome),
    }
}

/// Format a drain result based on output format
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_drain(outcome: &DrainOutcome, format: OutputFormat) -> Result<String, StepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_drain_outcome(outcome)),
        OutputFormat::Json => to_json(outcome),
    }
}
