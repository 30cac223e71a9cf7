//! JSON output formatting for stepsync.

use serde::Serialize;
use serde_json::json;

use crate::error::StepsyncError;
use crate::sync::{QueueItem, SyncStatus};

/// Format sync status as JSON
///
/// The full pending list is left to `format_queue_json`.
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_status_json(status: &SyncStatus) -> Result<String, StepsyncError> {
    let output = json!({
        "connectivity": status.connectivity,
        "draining": status.draining,
        "pending": status.pending_count,
        "retrying": status.retrying,
        "oldest_pending": status.oldest_pending.map(|t| t.to_rfc3339()),
        "last_successful_drain_at": status.last_successful_drain_at.map(|t| t.to_rfc3339()),
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format pending queue items as JSON
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn format_queue_json(items: &[QueueItem]) -> Result<String, StepsyncError> {
    let output = json!({
        "count": items.len(),
        "items": items
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Serialize any value as pretty JSON
///
/// # Errors
///
/// Returns `StepsyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, StepsyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{Connectivity, MutationOutcome};
    use chrono::Utc;

    fn make_item(id: &str) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            operation_type: "dailyEntry.upsert".to_string(),
            payload: r#"{"gratitude":"sunrise"}"#.to_string(),
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    #[test]
    fn test_format_status_json() {
        let item = make_item("q-1");
        let status = SyncStatus {
            connectivity: Connectivity::Online,
            draining: true,
            pending_count: 1,
            retrying: 0,
            oldest_pending: Some(item.enqueued_at),
            last_successful_drain_at: None,
            pending: vec![item],
        };

        let value: serde_json::Value =
            serde_json::from_str(&format_status_json(&status).unwrap()).unwrap();
        assert_eq!(value["connectivity"], "online");
        assert_eq!(value["draining"], true);
        assert_eq!(value["pending"], 1);
        assert!(value["oldest_pending"].is_string());
        assert!(value["last_successful_drain_at"].is_null());
    }

    #[test]
    fn test_format_queue_json() {
        let value: serde_json::Value =
            serde_json::from_str(&format_queue_json(&[make_item("a"), make_item("b")]).unwrap())
                .unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["items"][1]["id"], "b");
        assert_eq!(value["items"][0]["operation_type"], "dailyEntry.upsert");
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let outcome = MutationOutcome::AcceptedOffline { item: make_item("q-9") };
        let value: serde_json::Value = serde_json::from_str(&to_json(&outcome).unwrap()).unwrap();
        assert_eq!(value["status"], "accepted_offline");
        assert_eq!(value["item"]["id"], "q-9");
    }
}
