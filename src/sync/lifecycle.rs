//! Sync triggers.
//!
//! A background task drains the queue on startup, when connectivity returns,
//! when the app comes to the foreground, and on request. Each trigger spawns
//! its own drain; overlapping drains are absorbed by the engine's
//! single-flight flag.

use std::fmt;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::replay::{DrainOutcome, ReplayEngine};

/// Foreground state reported by the host app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// In the foreground.
    Active,
    /// Backgrounded or suspended.
    Background,
}

/// What caused a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    /// The service started.
    Startup,
    /// Connectivity went from offline to online.
    Reconnected,
    /// The app returned to the foreground.
    Foreground,
    /// Explicit request.
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::Reconnected => "reconnected",
            Self::Foreground => "foreground",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// A finished drain, published to subscribers.
#[derive(Debug, Clone)]
pub struct DrainEvent {
    /// What started the drain.
    pub trigger: SyncTrigger,
    /// The drain outcome, or the store error that aborted it.
    pub outcome: Result<DrainOutcome, String>,
}

enum Command {
    AppState(AppState),
    Sync,
    Shutdown,
}

/// Spawns the trigger task.
pub struct SyncLifecycle;

impl SyncLifecycle {
    /// Start listening for triggers.
    ///
    /// Subscribe to the returned handle before yielding to observe the
    /// startup drain.
    #[must_use]
    pub fn spawn(engine: ReplayEngine, drain_on_start: bool) -> LifecycleHandle {
        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(32);
        let publisher = events.clone();
        let mut connectivity = engine.state().subscribe();
        let mut was_online = connectivity.borrow_and_update().is_online();

        let task = tokio::spawn(async move {
            if drain_on_start {
                spawn_drain(&engine, SyncTrigger::Startup, &publisher);
            }

            loop {
                tokio::select! {
                    changed = connectivity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = connectivity.borrow_and_update().is_online();
                        if online && !was_online {
                            spawn_drain(&engine, SyncTrigger::Reconnected, &publisher);
                        }
                        was_online = online;
                    }
                    command = command_rx.recv() => match command {
                        Some(Command::AppState(AppState::Active)) => {
                            spawn_drain(&engine, SyncTrigger::Foreground, &publisher);
                        }
                        Some(Command::AppState(AppState::Background)) => {
                            tracing::debug!("app moved to background");
                        }
                        Some(Command::Sync) => {
                            spawn_drain(&engine, SyncTrigger::Manual, &publisher);
                        }
                        Some(Command::Shutdown) | None => break,
                    },
                }
            }
            tracing::debug!("sync lifecycle stopped");
        });

        LifecycleHandle {
            commands,
            events,
            task,
        }
    }
}

fn spawn_drain(engine: &ReplayEngine, trigger: SyncTrigger, events: &broadcast::Sender<DrainEvent>) {
    let engine = engine.clone();
    let events = events.clone();
    tokio::spawn(async move {
        tracing::debug!(%trigger, "drain triggered");
        let outcome = engine.drain().await.map_err(|e| {
            tracing::error!(%trigger, error = %e, "drain aborted");
            e.to_string()
        });
        // No subscribers is fine.
        let _ = events.send(DrainEvent { trigger, outcome });
    });
}

/// Control handle for a running lifecycle task.
pub struct LifecycleHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<DrainEvent>,
    task: JoinHandle<()>,
}

impl LifecycleHandle {
    /// Tell the lifecycle the app changed foreground state.
    pub fn report_app_state(&self, state: AppState) {
        self.send(Command::AppState(state));
    }

    /// Ask for a drain now.
    pub fn request_sync(&self) {
        self.send(Command::Sync);
    }

    /// Receive an event for every finished drain.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DrainEvent> {
        self.events.subscribe()
    }

    /// Stop listening for triggers. Drains already running finish on their
    /// own.
    pub async fn shutdown(self) {
        self.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sync lifecycle task failed");
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("sync lifecycle already stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::queue::QueueStore;
    use crate::sync::state::{Connectivity, SyncState};
    use crate::sync::test_helpers::{journal, StubRemote};
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(online: bool) -> (ReplayEngine, QueueStore, Arc<SyncState>) {
        let store = QueueStore::open_in_memory().unwrap();
        let payload = serde_json::to_string(&journal("queued").payload_value().unwrap()).unwrap();
        store
            .enqueue(journal("queued").operation_type(), payload)
            .await
            .unwrap();
        let state = Arc::new(SyncState::new(Connectivity::from_online(online)));
        let engine = ReplayEngine::new(store.clone(), Arc::new(StubRemote::new()), Arc::clone(&state));
        (engine, store, state)
    }

    async fn next_event(rx: &mut broadcast::Receiver<DrainEvent>) -> DrainEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_startup_drain() {
        let (engine, store, _) = setup(true).await;
        let handle = SyncLifecycle::spawn(engine, true);
        let mut rx = handle.subscribe();

        let event = next_event(&mut rx).await;
        assert_eq!(event.trigger, SyncTrigger::Startup);
        assert_eq!(event.outcome.unwrap().report().unwrap().succeeded, 1);
        assert_eq!(store.count().await.unwrap(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_triggers_drain() {
        let (engine, store, state) = setup(false).await;
        let handle = SyncLifecycle::spawn(engine, false);
        let mut rx = handle.subscribe();
        tokio::task::yield_now().await;

        state.set_connectivity(Connectivity::Online);

        let event = next_event(&mut rx).await;
        assert_eq!(event.trigger, SyncTrigger::Reconnected);
        assert_eq!(store.count().await.unwrap(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_before_task_runs_triggers_drain() {
        let (engine, store, state) = setup(false).await;
        let handle = SyncLifecycle::spawn(engine, false);
        let mut rx = handle.subscribe();

        // The task has not been polled yet on this single-threaded runtime.
        state.set_connectivity(Connectivity::Online);

        let event = next_event(&mut rx).await;
        assert_eq!(event.trigger, SyncTrigger::Reconnected);
        assert_eq!(store.count().await.unwrap(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_foreground_and_manual_triggers() {
        let (engine, _, _) = setup(true).await;
        let handle = SyncLifecycle::spawn(engine, false);
        let mut rx = handle.subscribe();

        handle.report_app_state(AppState::Active);
        assert_eq!(next_event(&mut rx).await.trigger, SyncTrigger::Foreground);

        handle.request_sync();
        let event = next_event(&mut rx).await;
        assert_eq!(event.trigger, SyncTrigger::Manual);
        assert_eq!(event.outcome.unwrap().report().unwrap().total(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_offline_trigger_is_skipped() {
        let (engine, store, _) = setup(false).await;
        let handle = SyncLifecycle::spawn(engine, false);
        let mut rx = handle.subscribe();

        handle.request_sync();
        let event = next_event(&mut rx).await;
        assert!(matches!(event.outcome, Ok(DrainOutcome::Skipped { .. })));
        assert_eq!(store.count().await.unwrap(), 1);

        handle.shutdown().await;
    }
}
