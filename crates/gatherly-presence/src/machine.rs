//! Presence derivation for all tabs of one browser profile.
//!
//! A visible tab makes the profile ONLINE. Open tabs that are all hidden
//! make it AWAY. Closing the last tab makes it OFFLINE, delivered as a
//! beacon so the write can outlive the page. A tab going hidden while a
//! sibling stays visible emits nothing.

use std::collections::HashMap;

use gatherly_entity::presence::PresenceStatus;

use crate::event::{LifecycleEvent, TabEvent, TabId};

/// How an emitted status must be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Normal request tied to the agent's lifetime.
    Request,
    /// Fire-and-forget write that must survive teardown.
    Beacon,
}

/// A status the machine wants reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    /// Status to report.
    pub status: PresenceStatus,
    /// Delivery path.
    pub delivery: Delivery,
}

impl Emission {
    fn request(status: PresenceStatus) -> Self {
        Self {
            status,
            delivery: Delivery::Request,
        }
    }

    fn beacon(status: PresenceStatus) -> Self {
        Self {
            status,
            delivery: Delivery::Beacon,
        }
    }
}

/// Pure state machine; performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct PresenceMachine {
    /// Open tabs and whether each is visible.
    tabs: HashMap<TabId, bool>,
    current: Option<PresenceStatus>,
}

impl PresenceMachine {
    /// A machine with no open tabs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last emitted status; OFFLINE before anything was emitted.
    pub fn status(&self) -> PresenceStatus {
        self.current.unwrap_or(PresenceStatus::Offline)
    }

    /// Number of open tabs.
    pub fn open_tabs(&self) -> usize {
        self.tabs.len()
    }

    fn any_visible(&self) -> bool {
        self.tabs.values().any(|visible| *visible)
    }

    /// The status implied by the open tabs, ignoring what was emitted.
    pub fn derived(&self) -> Option<PresenceStatus> {
        if self.tabs.is_empty() {
            None
        } else if self.any_visible() {
            Some(PresenceStatus::Online)
        } else {
            Some(PresenceStatus::Away)
        }
    }

    /// Whether every tab has closed and OFFLINE was emitted.
    pub fn is_closed(&self) -> bool {
        self.tabs.is_empty() && self.current == Some(PresenceStatus::Offline)
    }

    /// Applies one lifecycle event.
    pub fn apply(&mut self, event: TabEvent) -> Option<Emission> {
        let emission = match (event.event, event.event.visibility()) {
            (LifecycleEvent::Unloading, _) => self.unload(event.tab),
            (_, Some(true)) => {
                self.tabs.insert(event.tab, true);
                Some(Emission::request(PresenceStatus::Online))
            }
            (_, Some(false)) => {
                self.tabs.insert(event.tab, false);
                self.to_away()
            }
            (_, None) => None,
        };

        if let Some(emission) = emission {
            self.current = Some(emission.status);
        }
        emission
    }

    /// Periodic re-affirmation; ONLINE only while some tab is visible.
    pub fn heartbeat(&mut self) -> Option<Emission> {
        if !self.any_visible() {
            return None;
        }
        self.current = Some(PresenceStatus::Online);
        Some(Emission::request(PresenceStatus::Online))
    }

    /// Closes every tab at once.
    pub fn shutdown(&mut self) -> Option<Emission> {
        self.tabs.clear();
        match self.current {
            None | Some(PresenceStatus::Offline) => None,
            Some(_) => {
                self.current = Some(PresenceStatus::Offline);
                Some(Emission::beacon(PresenceStatus::Offline))
            }
        }
    }

    fn to_away(&self) -> Option<Emission> {
        if self.any_visible() || self.current == Some(PresenceStatus::Away) {
            None
        } else {
            Some(Emission::request(PresenceStatus::Away))
        }
    }

    fn unload(&mut self, tab: TabId) -> Option<Emission> {
        if self.tabs.remove(&tab).is_none() && !self.tabs.is_empty() {
            return None;
        }
        if self.tabs.is_empty() {
            return Some(Emission::beacon(PresenceStatus::Offline));
        }
        self.to_away()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(tab: TabId, event: LifecycleEvent) -> TabEvent {
        TabEvent::new(tab, event)
    }

    fn statuses(machine: &mut PresenceMachine, events: &[TabEvent]) -> Vec<PresenceStatus> {
        events
            .iter()
            .filter_map(|e| machine.apply(*e))
            .map(|e| e.status)
            .collect()
    }

    #[test]
    fn test_hidden_then_visible_emits_away_then_online() {
        let tab = TabId::new();
        let mut machine = PresenceMachine::new();
        let out = statuses(
            &mut machine,
            &[
                ev(tab, LifecycleEvent::Opened { visible: true }),
                ev(tab, LifecycleEvent::VisibilityChanged { hidden: true }),
                ev(tab, LifecycleEvent::VisibilityChanged { hidden: false }),
            ],
        );
        assert_eq!(
            out,
            vec![
                PresenceStatus::Online,
                PresenceStatus::Away,
                PresenceStatus::Online
            ]
        );
    }

    #[test]
    fn test_heartbeat_is_silent_while_hidden() {
        let tab = TabId::new();
        let mut machine = PresenceMachine::new();
        machine.apply(ev(tab, LifecycleEvent::Opened { visible: true }));
        assert!(machine.heartbeat().is_some());

        machine.apply(ev(tab, LifecycleEvent::VisibilityChanged { hidden: true }));
        assert!(machine.heartbeat().is_none());
        assert_eq!(machine.status(), PresenceStatus::Away);

        machine.apply(ev(tab, LifecycleEvent::Focused));
        assert_eq!(
            machine.heartbeat(),
            Some(Emission::request(PresenceStatus::Online))
        );
    }

    #[test]
    fn test_focus_and_restore_promote_to_online() {
        let tab = TabId::new();
        let mut machine = PresenceMachine::new();
        machine.apply(ev(tab, LifecycleEvent::Opened { visible: false }));
        assert_eq!(machine.status(), PresenceStatus::Away);

        let emitted = machine.apply(ev(tab, LifecycleEvent::RestoredFromCache));
        assert_eq!(emitted, Some(Emission::request(PresenceStatus::Online)));
    }

    #[test]
    fn test_unloading_last_tab_uses_beacon() {
        let tab = TabId::new();
        let mut machine = PresenceMachine::new();
        machine.apply(ev(tab, LifecycleEvent::Opened { visible: true }));

        let emitted = machine.apply(ev(tab, LifecycleEvent::Unloading));
        assert_eq!(emitted, Some(Emission::beacon(PresenceStatus::Offline)));
        assert!(machine.is_closed());
    }

    #[test]
    fn test_sibling_visible_tab_suppresses_away() {
        let (a, b) = (TabId::new(), TabId::new());
        let mut machine = PresenceMachine::new();
        machine.apply(ev(a, LifecycleEvent::Opened { visible: true }));
        machine.apply(ev(b, LifecycleEvent::Opened { visible: true }));

        assert_eq!(
            machine.apply(ev(a, LifecycleEvent::VisibilityChanged { hidden: true })),
            None
        );
        assert_eq!(machine.status(), PresenceStatus::Online);

        let emitted = machine.apply(ev(b, LifecycleEvent::VisibilityChanged { hidden: true }));
        assert_eq!(emitted, Some(Emission::request(PresenceStatus::Away)));
    }

    #[test]
    fn test_closing_visible_tab_leaves_hidden_sibling_away() {
        let (a, b) = (TabId::new(), TabId::new());
        let mut machine = PresenceMachine::new();
        machine.apply(ev(a, LifecycleEvent::Opened { visible: true }));
        machine.apply(ev(b, LifecycleEvent::Opened { visible: false }));

        let emitted = machine.apply(ev(a, LifecycleEvent::Unloading));
        assert_eq!(emitted, Some(Emission::request(PresenceStatus::Away)));
        assert_eq!(machine.open_tabs(), 1);
        assert!(!machine.is_closed());
    }

    #[test]
    fn test_shutdown_only_beacons_after_an_emission() {
        let mut machine = PresenceMachine::new();
        assert_eq!(machine.shutdown(), None);

        machine.apply(ev(TabId::new(), LifecycleEvent::Opened { visible: true }));
        assert_eq!(
            machine.shutdown(),
            Some(Emission::beacon(PresenceStatus::Offline))
        );
        assert_eq!(machine.shutdown(), None);
    }
}
