//! Process-wide, in-memory sync state.
//!
//! Nothing here is persisted; a restart begins offline, idle, and with no
//! recorded drain.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Whether the remote service is believed reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// The remote is believed reachable.
    Online,
    /// No link, or the remote did not answer.
    Offline,
}

impl Connectivity {
    #[must_use]
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

const NO_DRAIN: i64 = i64::MIN;

/// Shared sync flags: connectivity, the single-flight drain flag, and the
/// time of the last clean drain.
pub struct SyncState {
    connectivity: watch::Sender<Connectivity>,
    draining: AtomicBool,
    last_successful_drain_ms: AtomicI64,
}

impl SyncState {
    /// Create state with an initial connectivity guess.
    #[must_use]
    pub fn new(initial: Connectivity) -> Self {
        let (connectivity, _) = watch::channel(initial);
        Self {
            connectivity,
            draining: AtomicBool::new(false),
            last_successful_drain_ms: AtomicI64::new(NO_DRAIN),
        }
    }

    /// Latest connectivity snapshot.
    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// Publish a connectivity reading.
    ///
    /// Subscribers are woken only when the value changes. Returns `true` on a
    /// transition.
    pub fn set_connectivity(&self, next: Connectivity) -> bool {
        self.connectivity.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Receive connectivity transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.connectivity.subscribe()
    }

    /// Whether a drain is in progress.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Claim the drain flag.
    ///
    /// Returns `None` if another drain already holds it. The flag is released
    /// when the guard drops, including on early return or panic.
    #[must_use]
    pub fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard { state: self })
    }

    /// When the last drain finished with nothing left failing.
    #[must_use]
    pub fn last_successful_drain_at(&self) -> Option<DateTime<Utc>> {
        match self.last_successful_drain_ms.load(Ordering::Acquire) {
            NO_DRAIN => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    pub(crate) fn mark_successful_drain(&self, at: DateTime<Utc>) {
        self.last_successful_drain_ms
            .store(at.timestamp_millis(), Ordering::Release);
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(Connectivity::Offline)
    }
}

/// Holds the single-flight drain flag until dropped.
pub struct DrainGuard<'a> {
    state: &'a SyncState,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.state.draining.store(false, Ordering::Release);
    }
}
