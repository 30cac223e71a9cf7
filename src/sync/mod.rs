//! Offline-first sync.
//!
//! Writes made while the device is offline are persisted to a durable queue
//! and replayed against the remote service, in order, once connectivity
//! returns.
//!
//! Components:
//! - [`QueueStore`]: crash-safe FIFO of pending operations
//! - [`ReachabilityMonitor`]: online/offline view fed by a probe
//! - [`OfflineMutator`]: sends writes directly or queues them
//! - [`ReplayEngine`]: single-flight drain of the queue
//! - [`SyncLifecycle`]: drains on reconnect, foreground, or request
//! - [`SyncService`]: owns and wires all of the above

pub mod lifecycle;
pub mod monitor;
pub mod mutation;
pub mod operation;
pub mod queue;
pub mod replay;
pub mod service;
pub mod state;

#[cfg(test)]
mod test_helpers;

pub use lifecycle::{AppState, DrainEvent, LifecycleHandle, SyncLifecycle, SyncTrigger};
pub use monitor::{
    ConnectionType, ConnectivityProbe, HttpProbe, NetworkSnapshot, ReachabilityMonitor,
    ReportedConnectivity,
};
pub use mutation::{MutationOutcome, OfflineMutator};
pub use operation::{Mutation, OperationType, QueueItem};
pub use queue::{QueueStats, QueueStore};
pub use replay::{
    format_drain_outcome, format_drain_report, DrainOutcome, DrainReport, ReplayEngine,
    ReplayResult, ReplayStatus, SkipReason,
};
pub use service::{SyncService, SyncStatus};
pub use state::{Connectivity, SyncState};
