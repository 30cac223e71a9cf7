//! Offline-aware mutation submission.
//!
//! Online writes go straight to the remote service. Offline writes are queued
//! and the caller is told the write was accepted locally.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::monitor::ConnectivityProbe;
use super::operation::{Mutation, QueueItem};
use super::queue::QueueStore;
use super::state::{Connectivity, SyncState};
use crate::error::StepsyncError;
use crate::remote::RemoteApi;

/// What happened to a submitted mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The server accepted the write and returned this body.
    Confirmed { response: Value },
    /// The write was queued for replay.
    AcceptedOffline { item: QueueItem },
}

impl MutationOutcome {
    /// True only when the server has the write.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// The queued item, for offline outcomes.
    #[must_use]
    pub const fn queued_item(&self) -> Option<&QueueItem> {
        match self {
            Self::AcceptedOffline { item } => Some(item),
            Self::Confirmed { .. } => None,
        }
    }
}

/// Routes writes to the remote service or the offline queue.
#[derive(Clone)]
pub struct OfflineMutator {
    store: QueueStore,
    remote: Arc<dyn RemoteApi>,
    probe: Arc<dyn ConnectivityProbe>,
    state: Arc<SyncState>,
}

impl OfflineMutator {
    #[must_use]
    pub fn new(
        store: QueueStore,
        remote: Arc<dyn RemoteApi>,
        probe: Arc<dyn ConnectivityProbe>,
        state: Arc<SyncState>,
    ) -> Self {
        Self {
            store,
            remote,
            probe,
            state,
        }
    }

    /// Submit a mutation.
    ///
    /// Connectivity is checked fresh for every call. When online the remote
    /// call's result is returned as-is and nothing is queued, even if the
    /// call fails. When offline the mutation is committed to the queue before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` for mutations that fail validation, the remote
    /// error for failed online writes, or a store error if queueing fails.
    pub async fn submit(&self, mutation: Mutation) -> Result<MutationOutcome, StepsyncError> {
        mutation.validate()?;

        let snapshot = self.probe.check().await;
        let connectivity = Connectivity::from_online(snapshot.is_online());
        if self.state.set_connectivity(connectivity) {
            tracing::info!(%connectivity, "connectivity changed");
        }

        let operation = mutation.operation_type();
        if connectivity.is_online() {
            tracing::debug!(%operation, "submitting mutation online");
            let response = self.remote.execute(&mutation, None).await?;
            return Ok(MutationOutcome::Confirmed { response });
        }

        let payload = serde_json::to_string(&mutation.payload_value()?)?;
        let item = self.store.enqueue(operation, payload).await?;
        tracing::info!(id = %item.id, %operation, "offline; mutation queued");
        Ok(MutationOutcome::AcceptedOffline { item })
    }
}
