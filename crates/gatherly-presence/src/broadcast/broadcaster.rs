//! Mirrors the locally determined presence to every tab of the profile.
//!
//! Purely for display consistency. Nothing here talks to the server.

use tokio::sync::watch;
use tracing::warn;

use gatherly_core::result::AppResult;
use gatherly_entity::presence::PresenceStatus;

use super::storage::{SharedStorage, StorageListener};
use crate::event::TabId;

/// Publishes status changes from one tab.
#[derive(Debug)]
pub struct PresenceBroadcaster {
    storage: SharedStorage,
    key: String,
    tab: TabId,
    local: watch::Sender<Option<PresenceStatus>>,
}

impl PresenceBroadcaster {
    /// Broadcaster writing `key` on behalf of `tab`.
    pub fn new(storage: SharedStorage, key: impl Into<String>, tab: TabId) -> Self {
        let key = key.into();
        let initial = storage.get(&key).and_then(|v| v.parse().ok());
        let (local, _) = watch::channel(initial);
        Self {
            storage,
            key,
            tab,
            local,
        }
    }

    /// Records `status` in shared storage and notifies this tab's own UI.
    ///
    /// The local notification happens even if the storage write fails.
    pub fn publish(&self, status: PresenceStatus) -> AppResult<()> {
        self.local.send_replace(Some(status));
        self.storage.set(self.tab, &self.key, status.as_str())
    }

    /// In-page updates for the publishing tab.
    pub fn subscribe_local(&self) -> watch::Receiver<Option<PresenceStatus>> {
        self.local.subscribe()
    }

    /// An observer for a sibling tab of the same profile.
    pub fn observer(&self, tab: TabId) -> PresenceObserver {
        PresenceObserver::new(&self.storage, self.key.clone(), tab)
    }
}

/// A sibling tab's view of the mirrored status.
#[derive(Debug)]
pub struct PresenceObserver {
    listener: StorageListener,
    key: String,
    current: Option<PresenceStatus>,
}

impl PresenceObserver {
    /// Observes `key` in `storage` from `tab`.
    pub fn new(storage: &SharedStorage, key: impl Into<String>, tab: TabId) -> Self {
        let key = key.into();
        let current = storage.get(&key).and_then(|v| v.parse().ok());
        Self {
            listener: storage.listen(tab),
            key,
            current,
        }
    }

    /// Last status seen.
    pub fn current(&self) -> Option<PresenceStatus> {
        self.current
    }

    /// Waits for the next status written by another tab.
    pub async fn changed(&mut self) -> Option<PresenceStatus> {
        while let Some(event) = self.listener.recv().await {
            if event.key != self.key {
                continue;
            }
            let Some(raw) = event.new_value else {
                self.current = None;
                continue;
            };
            match raw.parse::<PresenceStatus>() {
                Ok(status) => {
                    self.current = Some(status);
                    return Some(status);
                }
                Err(e) => warn!(value = %raw, error = %e, "Ignoring unreadable presence value"),
            }
        }
        None
    }
}
