use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::sync::{Connectivity, MutationOutcome, QueueItem, SyncStatus};

/// Describe how long ago `at` was, coarsely.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(at);
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Format sync status as a summary block
pub fn format_status_pretty(status: &SyncStatus) -> String {
    let now = Utc::now();
    let mut lines = Vec::new();

    lines.push("Sync Status".bold().to_string());
    lines.push("─".repeat(40));

    let connectivity = match status.connectivity {
        Connectivity::Online => "online".green(),
        Connectivity::Offline => "offline".yellow(),
    };
    lines.push(format!("  Network:    {connectivity}"));

    if status.draining {
        lines.push(format!("  Activity:   {}", "syncing".cyan()));
    }

    lines.push(format!(
        "  Pending:    {} {}",
        status.pending_count,
        if status.pending_count > 0 {
            "operations waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));

    if status.retrying > 0 {
        lines.push(format!(
            "  Retrying:   {} {}",
            status.retrying,
            "operations have failed before".red()
        ));
    }

    if let Some(oldest) = status.oldest_pending {
        lines.push(format!("  Oldest:     {}", format_age(oldest, now).dimmed()));
    }

    let last = status
        .last_successful_drain_at
        .map_or_else(|| "never this session".to_string(), |t| format_age(t, now));
    lines.push(format!("  Last sync:  {}", last.dimmed()));

    if status.pending_count > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'stepsync sync' to replay pending operations"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format pending queue items as a list
pub fn format_queue_pretty(items: &[QueueItem]) -> String {
    if items.is_empty() {
        return "Pending operations (0 items)\n  Queue is empty".to_string();
    }

    let now = Utc::now();
    let mut output = format!("Pending operations ({} items)\n", items.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for item in items {
        let icon = if item.retry_count > 0 {
            "✗".red()
        } else {
            "○".yellow()
        };

        let mut line = format!("{} {}", icon, item.label().bold());
        if let Some(resource) = item.resource_key() {
            line.push_str(&format!("  {}", resource.cyan()));
        }
        line.push_str(&format!(
            "  {}  {}",
            item.id.dimmed(),
            format_age(item.enqueued_at, now).dimmed()
        ));

        if item.retry_count > 0 {
            line.push_str(&format!("  {}", format!("{} retries", item.retry_count).red()));
        }
        output.push_str(&line);
        output.push('\n');

        if let Some(error) = &item.last_error {
            output.push_str(&format!("    {}\n", error.red()));
        }
    }

    output
}

/// Format the result of a single write
pub fn format_outcome_pretty(outcome: &MutationOutcome) -> String {
    match outcome {
        MutationOutcome::Confirmed { .. } => format!("{} Saved", "✓".green()),
        MutationOutcome::AcceptedOffline { item } => format!(
            "{} Accepted offline (queued as {})",
            "○".yellow(),
            item.id
        ),
    }
}
