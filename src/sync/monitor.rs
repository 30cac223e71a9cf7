//! Network reachability monitoring.
//!
//! A [`ConnectivityProbe`] answers "can we reach the remote service right
//! now". The [`ReachabilityMonitor`] polls a probe and publishes only
//! transitions into [`SyncState`]. The view is best-effort: a real remote
//! call failing is always the final authority.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state::{Connectivity, SyncState};
use crate::remote::HttpRemote;

/// Physical link reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// No link at all.
    None,
    /// Wi-Fi
    Wifi,
    /// Mobile data
    Cellular,
    /// Wired
    Ethernet,
    /// A link of a type the platform did not name.
    Unknown,
}

/// One connectivity reading: link type plus the internet-reachable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Link type
    pub connection: ConnectionType,
    /// `None` while the platform has not determined reachability yet.
    pub internet_reachable: Option<bool>,
}

impl NetworkSnapshot {
    #[must_use]
    pub const fn online() -> Self {
        Self {
            connection: ConnectionType::Unknown,
            internet_reachable: Some(true),
        }
    }

    #[must_use]
    pub const fn offline() -> Self {
        Self {
            connection: ConnectionType::None,
            internet_reachable: Some(false),
        }
    }

    /// A link exists and reachability is not known to be false.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connection != ConnectionType::None && self.internet_reachable != Some(false)
    }
}

/// Boxed future returned by probes.
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = NetworkSnapshot> + Send + 'a>>;

/// A fresh reachability check.
pub trait ConnectivityProbe: Send + Sync {
    /// Take a new reading; never served from cache.
    fn check(&self) -> ProbeFuture<'_>;
}

/// Probe that asks the API host directly.
pub struct HttpProbe {
    remote: HttpRemote,
    timeout: Duration,
}

impl HttpProbe {
    #[must_use]
    pub const fn new(remote: HttpRemote, timeout: Duration) -> Self {
        Self { remote, timeout }
    }
}

impl ConnectivityProbe for HttpProbe {
    fn check(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            if self.remote.ping(self.timeout).await {
                NetworkSnapshot::online()
            } else {
                NetworkSnapshot {
                    connection: ConnectionType::Unknown,
                    internet_reachable: Some(false),
                }
            }
        })
    }
}

/// Probe fed by the host platform's connectivity callbacks.
///
/// The platform layer calls [`ReportedConnectivity::report`] whenever its
/// network API changes; checks return the latest report.
#[derive(Clone)]
pub struct ReportedConnectivity {
    snapshot: Arc<RwLock<NetworkSnapshot>>,
}

impl ReportedConnectivity {
    #[must_use]
    pub fn new(initial: NetworkSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(initial)),
        }
    }

    /// Record a new platform reading.
    pub fn report(&self, snapshot: NetworkSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Shorthand for reporting a plain online/offline reading.
    pub fn set_online(&self, online: bool) {
        self.report(if online {
            NetworkSnapshot::online()
        } else {
            NetworkSnapshot::offline()
        });
    }

    fn current(&self) -> NetworkSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl ConnectivityProbe for ReportedConnectivity {
    fn check(&self) -> ProbeFuture<'_> {
        let snapshot = self.current();
        Box::pin(async move { snapshot })
    }
}

/// Polls a probe and publishes connectivity transitions.
pub struct ReachabilityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    state: Arc<SyncState>,
    interval: Duration,
}

impl ReachabilityMonitor {
    #[must_use]
    pub fn new(probe: Arc<dyn ConnectivityProbe>, state: Arc<SyncState>, interval: Duration) -> Self {
        Self {
            probe,
            state,
            interval,
        }
    }

    /// Cached snapshot from the last poll.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state.connectivity().is_online()
    }

    /// Take a fresh reading, publish it, and return it.
    pub async fn refresh(&self) -> Connectivity {
        let snapshot = self.probe.check().await;
        let connectivity = Connectivity::from_online(snapshot.is_online());
        if self.state.set_connectivity(connectivity) {
            tracing::info!(%connectivity, ?snapshot.connection, "connectivity changed");
        } else {
            tracing::trace!(%connectivity, "connectivity unchanged");
        }
        connectivity
    }

    /// Receive connectivity transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Poll until `shutdown` flips to `true`.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("reachability monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_online_rules() {
        assert!(NetworkSnapshot::online().is_online());
        assert!(!NetworkSnapshot::offline().is_online());

        let undetermined = NetworkSnapshot {
            connection: ConnectionType::Wifi,
            internet_reachable: None,
        };
        assert!(undetermined.is_online());

        let captive = NetworkSnapshot {
            connection: ConnectionType::Wifi,
            internet_reachable: Some(false),
        };
        assert!(!captive.is_online());

        let no_link = NetworkSnapshot {
            connection: ConnectionType::None,
            internet_reachable: None,
        };
        assert!(!no_link.is_online());
    }

    #[tokio::test]
    async fn test_reported_probe_is_fresh() {
        let probe = ReportedConnectivity::new(NetworkSnapshot::offline());
        assert!(!probe.check().await.is_online());

        probe.set_online(true);
        assert!(probe.check().await.is_online());
    }

    #[tokio::test]
    async fn test_refresh_publishes_transitions_only() {
        let probe = ReportedConnectivity::new(NetworkSnapshot::offline());
        let state = Arc::new(SyncState::default());
        let monitor = ReachabilityMonitor::new(
            Arc::new(probe.clone()),
            Arc::clone(&state),
            Duration::from_secs(5),
        );
        let mut rx = monitor.subscribe();

        assert_eq!(monitor.refresh().await, Connectivity::Offline);
        assert!(!rx.has_changed().unwrap());

        probe.set_online(true);
        assert_eq!(monitor.refresh().await, Connectivity::Online);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        monitor.refresh().await;
        assert!(!rx.has_changed().unwrap());
        assert!(monitor.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_loop_sees_change() {
        let probe = ReportedConnectivity::new(NetworkSnapshot::offline());
        let state = Arc::new(SyncState::default());
        let monitor = Arc::new(ReachabilityMonitor::new(
            Arc::new(probe.clone()),
            Arc::clone(&state),
            Duration::from_secs(5),
        ));
        let mut rx = monitor.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = Arc::clone(&monitor).spawn(stop_rx);

        probe.set_online(true);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Connectivity::Online);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
