//! # Network Monitor
//!
//! Tracks whether the device believes it is online and tells subscribers
//! about every transition.
//!
//! The platform layer feeds its native online/offline signal into
//! [`NetworkMonitor::set_online`]. There is no polling or heartbeat
//! against the backend, so "online" means the network interface is up,
//! not that the backend is reachable. Failed calls while "online" are the
//! sync engine's problem.
//!
//! Subscribers get a [`tokio::sync::watch`] receiver. Rapid flapping may
//! be coalesced; a subscriber always sees the latest state.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

impl From<bool> for NetworkStatus {
    fn from(online: bool) -> Self {
        if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }
}

pub struct NetworkMonitor {
    status: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    /// Start from the platform's reachability at launch
    pub fn new(online: bool) -> Self {
        let (status, _) = watch::channel(NetworkStatus::from(online));
        Self { status }
    }

    pub fn get_status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.get_status().is_online()
    }

    /// Record the platform's current signal
    ///
    /// Returns `true` if this was a transition. Repeating the current state
    /// does not wake subscribers.
    pub fn set_online(&self, online: bool) -> bool {
        let next = NetworkStatus::from(online);
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            match next {
                NetworkStatus::Online => tracing::info!("network online"),
                NetworkStatus::Offline => tracing::warn!("network offline, serving from local store"),
            }
        }
        changed
    }

    /// Receiver that wakes on every transition
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
