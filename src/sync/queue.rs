//! Durable offline queue.
//!
//! Provides crash-safe, ordered persistence of pending operations. Each
//! insert is committed before `enqueue` returns; items leave the queue only
//! through [`QueueStore::remove`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use super::operation::{OperationType, QueueItem};
use crate::error::StepsyncError;
use crate::storage::Database;

/// Handle to the offline queue.
///
/// Clones share one connection. Every call runs on tokio's blocking pool so
/// the caller's task suspends instead of blocking the event loop.
#[derive(Clone)]
pub struct QueueStore {
    db: Arc<Mutex<Database>>,
}

impl QueueStore {
    /// Open the queue backed by the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_at(path: &Path) -> Result<Self, StepsyncError> {
        Ok(Self::with_database(Database::open_at(path)?))
    }

    /// Open a queue that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, StepsyncError> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    /// Create a queue with an existing database connection.
    #[must_use]
    pub fn with_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, StepsyncError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StepsyncError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| StepsyncError::Database("queue connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StepsyncError::Database(format!("queue task failed: {e}")))?
    }

    /// Add an operation to the queue.
    ///
    /// Assigns a fresh id and the current timestamp. The row is committed to
    /// disk before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be saved.
    pub async fn enqueue(
        &self,
        operation_type: OperationType,
        payload: String,
    ) -> Result<QueueItem, StepsyncError> {
        let item = QueueItem {
            id: Uuid::new_v4().to_string(),
            operation_type: operation_type.as_str().to_string(),
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        };

        let row = item.clone();
        self.with_db(move |db| {
            db.connection()
                .execute(
                    r"INSERT INTO offline_queue (id, operation_type, payload, enqueued_at, retry_count)
                      VALUES (?1, ?2, ?3, ?4, 0)",
                    params![row.id, row.operation_type, row.payload, row.enqueued_at.to_rfc3339()],
                )
                .map_err(|e| StepsyncError::Database(format!("Failed to enqueue operation: {e}")))?;
            Ok(())
        })
        .await?;

        tracing::debug!(id = %item.id, operation = %operation_type, "queued operation");
        Ok(item)
    }

    /// All pending items, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<QueueItem>, StepsyncError> {
        self.with_db(|db| {
            let mut stmt = db
                .connection()
                .prepare(
                    r"SELECT id, operation_type, payload, enqueued_at, retry_count, last_error
                      FROM offline_queue
                      ORDER BY seq ASC",
                )
                .map_err(|e| StepsyncError::Database(format!("Failed to prepare query: {e}")))?;

            let rows = stmt.query_map([], row_to_item).map_err(|e| {
                StepsyncError::Database(format!("Failed to query pending operations: {e}"))
            })?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
    }

    /// Get a specific item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<QueueItem>, StepsyncError> {
        let id = id.to_string();
        self.with_db(move |db| {
            db.connection()
                .query_row(
                    r"SELECT id, operation_type, payload, enqueued_at, retry_count, last_error
                      FROM offline_queue
                      WHERE id = ?1",
                    [&id],
                    row_to_item,
                )
                .optional()
                .map_err(|e| StepsyncError::Database(format!("Failed to query operation: {e}")))
        })
        .await
    }

    /// Delete an item.
    ///
    /// Removing an id that is not queued is not an error; the return value
    /// reports whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, id: &str) -> Result<bool, StepsyncError> {
        let id = id.to_string();
        self.with_db(move |db| {
            let rows = db
                .connection()
                .execute("DELETE FROM offline_queue WHERE id = ?1", [&id])
                .map_err(|e| StepsyncError::Database(format!("Failed to remove operation: {e}")))?;
            Ok(rows > 0)
        })
        .await
    }

    /// Increment the retry count and remember the failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn record_failure(&self, id: &str, error: &str) -> Result<(), StepsyncError> {
        let id = id.to_string();
        let error = error.to_string();
        self.with_db(move |db| {
            db.connection()
                .execute(
                    r"UPDATE offline_queue SET
                      retry_count = retry_count + 1,
                      last_error = ?1
                      WHERE id = ?2",
                    params![error, id],
                )
                .map_err(|e| StepsyncError::Database(format!("Failed to record attempt: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Number of pending items.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<usize, StepsyncError> {
        self.with_db(|db| {
            let count: i64 = db
                .connection()
                .query_row("SELECT COUNT(*) FROM offline_queue", [], |row| row.get(0))
                .map_err(|e| StepsyncError::Database(format!("Failed to count pending: {e}")))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn stats(&self) -> Result<QueueStats, StepsyncError> {
        self.with_db(|db| {
            let conn = db.connection();

            let (pending, retrying): (i64, i64) = conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(retry_count > 0), 0) FROM offline_queue",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| StepsyncError::Database(format!("Failed to count pending: {e}")))?;

            Ok(QueueStats {
                pending: usize::try_from(pending).unwrap_or(0),
                retrying: usize::try_from(retrying).unwrap_or(0),
                oldest_pending: oldest_enqueued(conn)?,
            })
        })
        .await
    }

    /// When the oldest pending item was queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn oldest_enqueued_at(&self) -> Result<Option<DateTime<Utc>>, StepsyncError> {
        self.with_db(|db| oldest_enqueued(db.connection())).await
    }
}

fn oldest_enqueued(conn: &Connection) -> Result<Option<DateTime<Utc>>, StepsyncError> {
    let oldest: Option<String> = conn
        .query_row(
            "SELECT enqueued_at FROM offline_queue ORDER BY seq ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StepsyncError::Database(format!("Failed to get oldest pending: {e}")))?;
    Ok(oldest.as_deref().and_then(parse_timestamp))
}

/// Queue statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    /// Number of pending operations
    pub pending: usize,
    /// Pending operations that have failed at least once
    pub retrying: usize,
    /// Oldest pending operation timestamp
    pub oldest_pending: Option<DateTime<Utc>>,
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn row_to_item(row: &Row<'_>) -> Result<QueueItem, rusqlite::Error> {
    let enqueued_at_str: String = row.get(3)?;
    let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at_str)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let retry_count: i64 = row.get(4)?;

    Ok(QueueItem {
        id: row.get(0)?,
        operation_type: row.get(1)?,
        payload: row.get(2)?,
        enqueued_at,
        retry_count: u32::try_from(retry_count).unwrap_or(u32::MAX),
        last_error: row.get(5)?,
    })
}
