//! Replay of queued operations against the remote service.
//!
//! A drain walks the queue oldest-first, one item at a time. An item leaves
//! the queue only after the remote call for it succeeds; every failure is
//! recorded on the item and the drain moves on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use super::operation::QueueItem;
use super::queue::QueueStore;
use super::state::SyncState;
use crate::error::StepsyncError;
use crate::remote::RemoteApi;

/// Why a drain did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Connectivity was offline when the drain was requested.
    Offline,
    /// Another drain holds the single-flight flag.
    AlreadyDraining,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::AlreadyDraining => f.write_str("a sync is already running"),
        }
    }
}

/// Result of one drain request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Nothing was attempted.
    Skipped { reason: SkipReason },
    /// Every pending item was visited once.
    Completed { report: DrainReport },
}

impl DrainOutcome {
    #[must_use]
    pub const fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Completed { report } => Some(report),
            Self::Skipped { .. } => None,
        }
    }
}

/// How a single item fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Accepted by the remote and removed from the queue.
    Succeeded,
    /// Remote call failed; kept for the next drain.
    Failed,
    /// Type or payload not understood by this build.
    Unresolved,
    /// Retry cap reached; left in place without a remote call.
    Stalled,
}

/// Result of replaying one queued item.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    /// Queue item ID
    pub id: String,
    /// Stored operation identifier
    pub operation_type: String,
    /// How the replay went
    pub status: ReplayStatus,
    /// Error message if not successful
    pub error: Option<String>,
}

/// Summary of a completed drain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    /// Number of items replayed and removed
    pub succeeded: usize,
    /// Number of remote failures
    pub failed: usize,
    /// Number of items this build cannot resolve
    pub unresolved: usize,
    /// Number of items skipped at the retry cap
    pub stalled: usize,
    /// Per-item results, in queue order
    pub results: Vec<ReplayResult>,
    /// Wall time of the drain
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl DrainReport {
    /// Add a result.
    pub fn add(&mut self, result: ReplayResult) {
        match result.status {
            ReplayStatus::Succeeded => self.succeeded += 1,
            ReplayStatus::Failed => self.failed += 1,
            ReplayStatus::Unresolved => self.unresolved += 1,
            ReplayStatus::Stalled => self.stalled += 1,
        }
        self.results.push(result);
    }

    /// Nothing was left behind.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.unresolved == 0 && self.stalled == 0
    }

    /// Total items visited.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed + self.unresolved + self.stalled
    }
}

#[allow(clippy::cast_possible_truncation)]
fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Drains the offline queue.
#[derive(Clone)]
pub struct ReplayEngine {
    store: QueueStore,
    remote: Arc<dyn RemoteApi>,
    state: Arc<SyncState>,
    max_retries: Option<u32>,
}

impl ReplayEngine {
    #[must_use]
    pub fn new(store: QueueStore, remote: Arc<dyn RemoteApi>, state: Arc<SyncState>) -> Self {
        Self {
            store,
            remote,
            state,
            max_retries: None,
        }
    }

    /// Skip items that have already failed `max` times.
    #[must_use]
    pub const fn with_max_retries(mut self, max: Option<u32>) -> Self {
        self.max_retries = max;
        self
    }

    /// Shared state this engine reads and updates.
    #[must_use]
    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    /// Replay every pending item once, in queue order.
    ///
    /// Returns `Skipped` when offline or when another drain holds the flag.
    /// Remote failures never abort the drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue store itself fails; the drain stops at
    /// that point and remaining items stay queued.
    pub async fn drain(&self) -> Result<DrainOutcome, StepsyncError> {
        if !self.state.connectivity().is_online() {
            tracing::debug!("drain skipped: offline");
            return Ok(DrainOutcome::Skipped {
                reason: SkipReason::Offline,
            });
        }
        let Some(_guard) = self.state.try_begin_drain() else {
            tracing::debug!("drain skipped: already draining");
            return Ok(DrainOutcome::Skipped {
                reason: SkipReason::AlreadyDraining,
            });
        };

        let started = Instant::now();
        let pending = self.store.list_pending().await?;
        tracing::debug!(pending = pending.len(), "drain started");

        let mut report = DrainReport::default();
        for item in pending {
            let result = self.replay_one(&item).await?;
            report.add(result);
        }
        report.duration = started.elapsed();

        if report.is_clean() {
            self.state.mark_successful_drain(Utc::now());
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            unresolved = report.unresolved,
            stalled = report.stalled,
            elapsed = ?report.duration,
            "drain finished"
        );

        Ok(DrainOutcome::Completed { report })
    }

    async fn replay_one(&self, item: &QueueItem) -> Result<ReplayResult, StepsyncError> {
        let result = |status, error| ReplayResult {
            id: item.id.clone(),
            operation_type: item.operation_type.clone(),
            status,
            error,
        };

        let mutation = match item.resolve() {
            Ok(mutation) => mutation,
            Err(e) => {
                tracing::error!(id = %item.id, operation = %item.operation_type, error = %e, "cannot resolve queued operation");
                let message = e.to_string();
                self.store.record_failure(&item.id, &message).await?;
                return Ok(result(ReplayStatus::Unresolved, Some(message)));
            },
        };

        if let Some(max) = self.max_retries {
            if item.retry_count >= max {
                tracing::debug!(id = %item.id, retries = item.retry_count, "skipping stalled operation");
                return Ok(result(ReplayStatus::Stalled, item.last_error.clone()));
            }
        }

        match self.remote.execute(&mutation, Some(&item.id)).await {
            Ok(_) => {
                self.store.remove(&item.id).await?;
                tracing::debug!(id = %item.id, operation = %item.operation_type, "replayed");
                Ok(result(ReplayStatus::Succeeded, None))
            },
            Err(e) => {
                if e.is_remote_failure() {
                    tracing::warn!(id = %item.id, operation = %item.operation_type, error = %e, "replay failed");
                } else {
                    tracing::error!(id = %item.id, operation = %item.operation_type, error = %e, "replay failed before a remote answer");
                }
                let message = e.to_string();
                self.store.record_failure(&item.id, &message).await?;
                Ok(result(ReplayStatus::Failed, Some(message)))
            },
        }
    }
}

/// Format a drain outcome for display.
#[must_use]
pub fn format_drain_outcome(outcome: &DrainOutcome) -> String {
    match outcome {
        DrainOutcome::Skipped { reason } => {
            format!("{} Sync skipped: {reason}", "○".yellow())
        },
        DrainOutcome::Completed { report } => format_drain_report(report),
    }
}

/// Format a drain report for display.
#[must_use]
pub fn format_drain_report(report: &DrainReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Sync completed: {} operations in {} ms",
        report.total(),
        report.duration.as_millis()
    ));
    lines.push("─".repeat(40));

    if report.total() == 0 {
        lines.push(format!("  {}", "Queue is empty".dimmed()));
    }

    if report.succeeded > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} succeeded", report.succeeded).green()
        ));
    }

    if report.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed", report.failed).red()
        ));
    }

    if report.unresolved > 0 {
        lines.push(format!(
            "  {} {}",
            "!".red().bold(),
            format!("{} unresolved", report.unresolved).red()
        ));
    }

    if report.stalled > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} stalled", report.stalled).yellow()
        ));
    }

    let errors: Vec<_> = report
        .results
        .iter()
        .filter(|r| matches!(r.status, ReplayStatus::Failed | ReplayStatus::Unresolved))
        .take(3)
        .collect();

    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for err in errors {
            lines.push(format!(
                "  - {}: {}",
                err.operation_type,
                err.error.as_deref().unwrap_or("Unknown error")
            ));
        }
    }

    lines.join("\n")
}
