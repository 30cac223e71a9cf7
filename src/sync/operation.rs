//! Operation types for the offline queue.
//!
//! Defines the closed set of remote operations a queued item may represent,
//! their typed payloads, and the persisted queue item itself.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StepsyncError;

/// Remote operations that can be queued.
///
/// The string identifiers are shared with the server and must not change
/// within a [`OperationType::SCHEMA_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Create a journal entry
    #[serde(rename = "journal.create")]
    JournalCreate,
    /// Edit a journal entry
    #[serde(rename = "journal.update")]
    JournalUpdate,
    /// Delete a journal entry
    #[serde(rename = "journal.delete")]
    JournalDelete,
    /// Create or replace the daily check-in
    #[serde(rename = "dailyEntry.upsert")]
    DailyEntryUpsert,
    /// Create or replace a step work answer
    #[serde(rename = "stepEntry.upsert")]
    StepEntryUpsert,
    /// Create a routine
    #[serde(rename = "routine.create")]
    RoutineCreate,
    /// Edit a routine
    #[serde(rename = "routine.update")]
    RoutineUpdate,
    /// Delete a routine
    #[serde(rename = "routine.delete")]
    RoutineDelete,
    /// Edit the user's profile
    #[serde(rename = "profile.update")]
    ProfileUpdate,
}

impl OperationType {
    /// Version of the operation set understood by this client.
    pub const SCHEMA_VERSION: u32 = 1;

    /// Every known operation, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::JournalCreate,
        Self::JournalUpdate,
        Self::JournalDelete,
        Self::DailyEntryUpsert,
        Self::StepEntryUpsert,
        Self::RoutineCreate,
        Self::RoutineUpdate,
        Self::RoutineDelete,
        Self::ProfileUpdate,
    ];

    /// Wire identifier stored in the queue.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JournalCreate => "journal.create",
            Self::JournalUpdate => "journal.update",
            Self::JournalDelete => "journal.delete",
            Self::DailyEntryUpsert => "dailyEntry.upsert",
            Self::StepEntryUpsert => "stepEntry.upsert",
            Self::RoutineCreate => "routine.create",
            Self::RoutineUpdate => "routine.update",
            Self::RoutineDelete => "routine.delete",
            Self::ProfileUpdate => "profile.update",
        }
    }

    /// Get the display name for this operation type.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::JournalCreate => "New journal entry",
            Self::JournalUpdate => "Edit journal entry",
            Self::JournalDelete => "Delete journal entry",
            Self::DailyEntryUpsert => "Daily check-in",
            Self::StepEntryUpsert => "Step work",
            Self::RoutineCreate => "New routine",
            Self::RoutineUpdate => "Edit routine",
            Self::RoutineDelete => "Delete routine",
            Self::ProfileUpdate => "Profile update",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = StepsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| StepsyncError::UnknownOperation(s.to_string()))
    }
}

/// Payload for creating a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryPayload {
    /// Client-chosen id, if the caller wants the server to use one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
}

/// Payload for editing a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalUpdatePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Payload for deletions addressed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIdPayload {
    pub id: String,
}

/// Payload for the daily check-in.
///
/// Every field is optional; the server merges what is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyEntryPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gratitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub craving_level: Option<u8>,
}

/// Payload for a step work answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntryPayload {
    /// Step number, 1 through 12.
    pub step_number: u8,
    pub question_index: u32,
    pub answer: String,
}

/// Payload for creating a routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutinePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Payload for editing a routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineUpdatePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Payload for a profile edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sobriety_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_group: Option<String>,
}

/// A domain write, typed by operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    JournalCreate(JournalEntryPayload),
    JournalUpdate(JournalUpdatePayload),
    JournalDelete(EntityIdPayload),
    DailyEntryUpsert(DailyEntryPayload),
    StepEntryUpsert(StepEntryPayload),
    RoutineCreate(RoutinePayload),
    RoutineUpdate(RoutineUpdatePayload),
    RoutineDelete(EntityIdPayload),
    ProfileUpdate(ProfileUpdatePayload),
}

impl Mutation {
    /// The operation this mutation performs.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        match self {
            Self::JournalCreate(_) => OperationType::JournalCreate,
            Self::JournalUpdate(_) => OperationType::JournalUpdate,
            Self::JournalDelete(_) => OperationType::JournalDelete,
            Self::DailyEntryUpsert(_) => OperationType::DailyEntryUpsert,
            Self::StepEntryUpsert(_) => OperationType::StepEntryUpsert,
            Self::RoutineCreate(_) => OperationType::RoutineCreate,
            Self::RoutineUpdate(_) => OperationType::RoutineUpdate,
            Self::RoutineDelete(_) => OperationType::RoutineDelete,
            Self::ProfileUpdate(_) => OperationType::ProfileUpdate,
        }
    }

    /// Logical resource this mutation writes to.
    ///
    /// Two mutations with the same key must replay in the order they were
    /// queued.
    #[must_use]
    pub fn resource_key(&self) -> String {
        match self {
            Self::JournalCreate(p) => {
                format!("journal:{}", p.id.as_deref().unwrap_or("new"))
            },
            Self::JournalUpdate(p) => format!("journal:{}", p.id),
            Self::JournalDelete(p) => format!("journal:{}", p.id),
            Self::DailyEntryUpsert(p) => match p.date {
                Some(date) => format!("dailyEntry:{date}"),
                None => "dailyEntry:today".to_string(),
            },
            Self::StepEntryUpsert(p) => {
                format!("stepEntry:{}:{}", p.step_number, p.question_index)
            },
            Self::RoutineCreate(p) => {
                format!("routine:{}", p.id.as_deref().unwrap_or("new"))
            },
            Self::RoutineUpdate(p) => format!("routine:{}", p.id),
            Self::RoutineDelete(p) => format!("routine:{}", p.id),
            Self::ProfileUpdate(_) => "profile".to_string(),
        }
    }

    /// Serialize the payload as the JSON the remote operation expects.
    ///
    /// # Errors
    ///
    /// Returns `StepsyncError::Parse` if serialization fails.
    pub fn payload_value(&self) -> Result<serde_json::Value, StepsyncError> {
        let value = match self {
            Self::JournalCreate(p) => serde_json::to_value(p)?,
            Self::JournalUpdate(p) => serde_json::to_value(p)?,
            Self::JournalDelete(p) | Self::RoutineDelete(p) => serde_json::to_value(p)?,
            Self::DailyEntryUpsert(p) => serde_json::to_value(p)?,
            Self::StepEntryUpsert(p) => serde_json::to_value(p)?,
            Self::RoutineCreate(p) => serde_json::to_value(p)?,
            Self::RoutineUpdate(p) => serde_json::to_value(p)?,
            Self::ProfileUpdate(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }

    /// Rebuild a mutation from a stored operation identifier and payload.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperation` for identifiers outside the known set and
    /// `InvalidPayload` when the payload does not fit the operation.
    pub fn from_parts(operation_type: &str, payload: &str) -> Result<Self, StepsyncError> {
        let op: OperationType = operation_type.parse()?;
        let mutation = match op {
            OperationType::JournalCreate => Self::JournalCreate(decode(op, payload)?),
            OperationType::JournalUpdate => Self::JournalUpdate(decode(op, payload)?),
            OperationType::JournalDelete => Self::JournalDelete(decode(op, payload)?),
            OperationType::DailyEntryUpsert => Self::DailyEntryUpsert(decode(op, payload)?),
            OperationType::StepEntryUpsert => Self::StepEntryUpsert(decode(op, payload)?),
            OperationType::RoutineCreate => Self::RoutineCreate(decode(op, payload)?),
            OperationType::RoutineUpdate => Self::RoutineUpdate(decode(op, payload)?),
            OperationType::RoutineDelete => Self::RoutineDelete(decode(op, payload)?),
            OperationType::ProfileUpdate => Self::ProfileUpdate(decode(op, payload)?),
        };
        mutation.validate()?;
        Ok(mutation)
    }

    /// Check constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` describing the first violation.
    pub fn validate(&self) -> Result<(), StepsyncError> {
        let invalid = |reason: &str| StepsyncError::InvalidPayload {
            operation: self.operation_type().as_str().to_string(),
            reason: reason.to_string(),
        };

        match self {
            Self::JournalUpdate(JournalUpdatePayload { id, .. })
            | Self::JournalDelete(EntityIdPayload { id })
            | Self::RoutineUpdate(RoutineUpdatePayload { id, .. })
            | Self::RoutineDelete(EntityIdPayload { id })
                if id.trim().is_empty() =>
            {
                Err(invalid("id must not be empty"))
            },
            Self::JournalUpdate(JournalUpdatePayload { id, .. })
            | Self::JournalDelete(EntityIdPayload { id })
            | Self::RoutineUpdate(RoutineUpdatePayload { id, .. })
            | Self::RoutineDelete(EntityIdPayload { id })
                if id == "." || id == ".." =>
            {
                Err(invalid("id must not be a dot segment"))
            },
            Self::StepEntryUpsert(p) if !(1..=12).contains(&p.step_number) => {
                Err(invalid("step_number must be between 1 and 12"))
            },
            Self::RoutineCreate(p) if p.name.trim().is_empty() => {
                Err(invalid("name must not be empty"))
            },
            _ => Ok(()),
        }
    }
}

fn decode<T: DeserializeOwned>(op: OperationType, payload: &str) -> Result<T, StepsyncError> {
    serde_json::from_str(payload).map_err(|e| StepsyncError::InvalidPayload {
        operation: op.as_str().to_string(),
        reason: e.to_string(),
    })
}

/// One pending operation awaiting remote execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Client-generated handle, meaningless to the server.
    pub id: String,
    /// Operation identifier as stored; may be unknown to this build.
    pub operation_type: String,
    /// JSON payload, opaque to the queue
    pub payload: String,
    /// When the operation was queued
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed replay attempts
    pub retry_count: u32,
    /// Most recent replay failure
    pub last_error: Option<String>,
}

impl QueueItem {
    /// Resolve this item into a typed mutation.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type or payload is not understood.
    pub fn resolve(&self) -> Result<Mutation, StepsyncError> {
        Mutation::from_parts(&self.operation_type, &self.payload)
    }

    /// Resource the stored operation writes to, if it resolves.
    #[must_use]
    pub fn resource_key(&self) -> Option<String> {
        self.resolve().ok().map(|m| m.resource_key())
    }

    /// Human-readable label for the operation, falling back to the raw tag.
    #[must_use]
    pub fn label(&self) -> String {
        self.operation_type
            .parse::<OperationType>()
            .map_or_else(|_| self.operation_type.clone(), |op| op.display_name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_type_round_trips_identifier() {
        for op in OperationType::ALL {
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operation_fails_loudly() {
        let err = "journal.archive".parse::<OperationType>().unwrap_err();
        assert!(matches!(err, StepsyncError::UnknownOperation(ref s) if s == "journal.archive"));
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn test_serde_uses_wire_identifiers() {
        let json = serde_json::to_string(&OperationType::DailyEntryUpsert).unwrap();
        assert_eq!(json, "\"dailyEntry.upsert\"");
    }

    #[test]
    fn test_daily_entry_payload_is_exact() {
        let mutation = Mutation::DailyEntryUpsert(DailyEntryPayload {
            gratitude: Some("sunrise".to_string()),
            ..DailyEntryPayload::default()
        });
        assert_eq!(mutation.payload_value().unwrap(), json!({"gratitude": "sunrise"}));
    }

    #[test]
    fn test_from_parts_decodes_typed_payload() {
        let mutation =
            Mutation::from_parts("journal.update", r#"{"id":"j-1","content":"day 30"}"#).unwrap();
        match mutation {
            Mutation::JournalUpdate(p) => {
                assert_eq!(p.id, "j-1");
                assert_eq!(p.content.as_deref(), Some("day 30"));
                assert!(p.title.is_none());
            },
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn test_from_parts_rejects_mismatched_payload() {
        let err = Mutation::from_parts("stepEntry.upsert", r#"{"answer":"x"}"#).unwrap_err();
        assert!(matches!(err, StepsyncError::InvalidPayload { ref operation, .. } if operation == "stepEntry.upsert"));
    }

    #[test]
    fn test_validate_step_range() {
        let err = Mutation::from_parts(
            "stepEntry.upsert",
            r#"{"step_number":13,"question_index":0,"answer":"x"}"#,
        )
        .unwrap_err();
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn test_validate_empty_id() {
        let err = Mutation::from_parts("routine.delete", r#"{"id":"  "}"#).unwrap_err();
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn test_validate_dot_segment_id() {
        let err = Mutation::from_parts("journal.delete", r#"{"id":".."}"#).unwrap_err();
        assert!(matches!(err, StepsyncError::InvalidPayload { ref reason, .. } if reason.contains("dot segment")));
        assert!(Mutation::from_parts("journal.delete", r#"{"id":"..j-1"}"#).is_ok());
    }

    #[test]
    fn test_routine_defaults_active() {
        let mutation = Mutation::from_parts("routine.create", r#"{"name":"Morning prayer"}"#).unwrap();
        assert_eq!(
            mutation,
            Mutation::RoutineCreate(RoutinePayload {
                id: None,
                name: "Morning prayer".to_string(),
                time_of_day: None,
                days: Vec::new(),
                active: true,
            })
        );
    }

    #[test]
    fn test_resource_keys() {
        let update = Mutation::JournalUpdate(JournalUpdatePayload {
            id: "j-9".to_string(),
            title: None,
            content: Some("edit".to_string()),
            mood: None,
            tags: None,
        });
        let delete = Mutation::JournalDelete(EntityIdPayload {
            id: "j-9".to_string(),
        });
        assert_eq!(update.resource_key(), delete.resource_key());
        assert_eq!(
            Mutation::ProfileUpdate(ProfileUpdatePayload::default()).resource_key(),
            "profile"
        );
        assert_eq!(
            Mutation::DailyEntryUpsert(DailyEntryPayload::default()).resource_key(),
            "dailyEntry:today"
        );
    }

    #[test]
    fn test_queue_item_label_falls_back() {
        let mut item = QueueItem {
            id: "a".to_string(),
            operation_type: "dailyEntry.upsert".to_string(),
            payload: "{}".to_string(),
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        };
        assert_eq!(item.label(), "Daily check-in");

        assert_eq!(item.resource_key().as_deref(), Some("dailyEntry:today"));

        item.operation_type = "legacy.thing".to_string();
        assert_eq!(item.label(), "legacy.thing");
        assert!(item.resolve().is_err());
        assert!(item.resource_key().is_none());
    }
}
