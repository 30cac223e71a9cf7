//! Wiring for the sync subsystem.
//!
//! [`SyncService`] owns the queue, shared state, monitor, wrapper and replay
//! engine, and starts or stops the background tasks as a unit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::lifecycle::{AppState, DrainEvent, LifecycleHandle, SyncLifecycle};
use super::monitor::{ConnectivityProbe, HttpProbe, ReachabilityMonitor};
use super::mutation::{MutationOutcome, OfflineMutator};
use super::operation::{Mutation, QueueItem};
use super::queue::QueueStore;
use super::replay::{DrainOutcome, ReplayEngine};
use super::state::{Connectivity, SyncState};
use crate::config::{Config, Paths};
use crate::error::StepsyncError;
use crate::remote::{HttpRemote, RemoteApi};

/// Snapshot of sync health for display.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// Last known connectivity.
    pub connectivity: Connectivity,
    /// Whether a drain is running.
    pub draining: bool,
    /// Number of pending items.
    pub pending_count: usize,
    /// Pending items that have failed at least once.
    pub retrying: usize,
    /// When the oldest pending item was queued.
    pub oldest_pending: Option<DateTime<Utc>>,
    /// End of the last drain that left nothing behind, this session.
    pub last_successful_drain_at: Option<DateTime<Utc>>,
    /// Pending items, oldest first.
    pub pending: Vec<QueueItem>,
}

struct Running {
    lifecycle: LifecycleHandle,
    monitor_stop: watch::Sender<bool>,
    monitor_task: JoinHandle<()>,
}

/// The offline sync subsystem.
pub struct SyncService {
    store: QueueStore,
    state: Arc<SyncState>,
    monitor: Arc<ReachabilityMonitor>,
    mutator: OfflineMutator,
    engine: ReplayEngine,
    drain_on_start: bool,
    running: Option<Running>,
}

impl SyncService {
    /// Open the queue under `paths` and connect to the configured remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory or queue database cannot be
    /// opened, or the HTTP client cannot be built.
    pub fn open(config: &Config, paths: &Paths) -> Result<Self, StepsyncError> {
        paths.ensure_dirs()?;
        let store = QueueStore::open_at(&paths.database)?;
        let remote = HttpRemote::new(&config.remote)?;
        let probe = HttpProbe::new(remote.clone(), config.connectivity.probe_timeout());
        tracing::debug!(base_url = remote.base_url(), db = %paths.database.display(), "sync service opened");
        Ok(Self::with_parts(store, Arc::new(remote), Arc::new(probe), config))
    }

    /// Assemble a service from existing parts.
    #[must_use]
    pub fn with_parts(
        store: QueueStore,
        remote: Arc<dyn RemoteApi>,
        probe: Arc<dyn ConnectivityProbe>,
        config: &Config,
    ) -> Self {
        let state = Arc::new(SyncState::default());
        let monitor = Arc::new(ReachabilityMonitor::new(
            Arc::clone(&probe),
            Arc::clone(&state),
            config.connectivity.poll_interval(),
        ));
        let mutator = OfflineMutator::new(store.clone(), Arc::clone(&remote), probe, Arc::clone(&state));
        let engine = ReplayEngine::new(store.clone(), remote, Arc::clone(&state))
            .with_max_retries(config.sync.max_retries);

        Self {
            store,
            state,
            monitor,
            mutator,
            engine,
            drain_on_start: config.sync.drain_on_start,
            running: None,
        }
    }

    /// Start the reachability monitor and the trigger task.
    ///
    /// Connectivity is checked once before the tasks start so a startup drain
    /// sees a real reading. Calling this twice has no effect.
    pub async fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        self.monitor.refresh().await;

        let (monitor_stop, stop_rx) = watch::channel(false);
        let monitor_task = Arc::clone(&self.monitor).spawn(stop_rx);
        let lifecycle = SyncLifecycle::spawn(self.engine.clone(), self.drain_on_start);
        tracing::info!(connectivity = %self.state.connectivity(), "sync service started");

        self.running = Some(Running {
            lifecycle,
            monitor_stop,
            monitor_task,
        });
    }

    /// Stop background tasks. In-flight drains are left to finish.
    pub async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.monitor_stop.send(true);
        if let Err(e) = running.monitor_task.await {
            tracing::warn!(error = %e, "reachability monitor task failed");
        }
        running.lifecycle.shutdown().await;
        tracing::info!("sync service stopped");
    }

    /// Whether background tasks are running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Forward a foreground/background change to the trigger task.
    pub fn report_app_state(&self, app_state: AppState) {
        if let Some(running) = &self.running {
            running.lifecycle.report_app_state(app_state);
        }
    }

    /// Drain events from the trigger task, if started.
    #[must_use]
    pub fn subscribe_drains(&self) -> Option<tokio::sync::broadcast::Receiver<DrainEvent>> {
        self.running.as_ref().map(|r| r.lifecycle.subscribe())
    }

    /// Take a fresh connectivity reading.
    pub async fn refresh_connectivity(&self) -> Connectivity {
        self.monitor.refresh().await
    }

    /// Submit a write through the offline-aware wrapper.
    ///
    /// # Errors
    ///
    /// See [`OfflineMutator::submit`].
    pub async fn submit(&self, mutation: Mutation) -> Result<MutationOutcome, StepsyncError> {
        self.mutator.submit(mutation).await
    }

    /// Check connectivity and drain now.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue store fails during the drain.
    pub async fn sync_now(&self) -> Result<DrainOutcome, StepsyncError> {
        self.monitor.refresh().await;
        self.engine.drain().await
    }

    /// Pending items, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub async fn pending(&self) -> Result<Vec<QueueItem>, StepsyncError> {
        self.store.list_pending().await
    }

    /// Current sync health.
    ///
    /// Uses the cached connectivity; call [`Self::refresh_connectivity`]
    /// first for a fresh reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub async fn status(&self) -> Result<SyncStatus, StepsyncError> {
        let stats = self.store.stats().await?;
        let pending = self.store.list_pending().await?;

        Ok(SyncStatus {
            connectivity: self.state.connectivity(),
            draining: self.state.is_draining(),
            pending_count: pending.len(),
            retrying: stats.retrying,
            oldest_pending: stats.oldest_pending,
            last_successful_drain_at: self.state.last_successful_drain_at(),
            pending,
        })
    }
}
