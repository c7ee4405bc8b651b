//! Tab identity and page lifecycle events.

use std::fmt;

use uuid::Uuid;

/// Identifies one tab within a browser profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    /// Origin of changes made by another process sharing the profile.
    pub const REMOTE: TabId = TabId(Uuid::nil());

    /// A fresh random tab ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A page lifecycle signal observed by a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The tab was opened, in the foreground or in the background.
    Opened {
        /// Whether the page starts visible.
        visible: bool,
    },
    /// The page's visibility changed.
    VisibilityChanged {
        /// Whether the page is now hidden.
        hidden: bool,
    },
    /// The window gained focus.
    Focused,
    /// The page was restored from the back/forward cache.
    RestoredFromCache,
    /// The page is being torn down.
    Unloading,
}

impl LifecycleEvent {
    /// Whether the tab is visible after this event, if the event says.
    pub fn visibility(self) -> Option<bool> {
        match self {
            Self::Opened { visible } => Some(visible),
            Self::VisibilityChanged { hidden } => Some(!hidden),
            Self::Focused | Self::RestoredFromCache => Some(true),
            Self::Unloading => None,
        }
    }
}

/// A lifecycle event tagged with the tab it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabEvent {
    /// Originating tab.
    pub tab: TabId,
    /// What happened.
    pub event: LifecycleEvent,
}

impl TabEvent {
    /// Tags `event` with `tab`.
    pub fn new(tab: TabId, event: LifecycleEvent) -> Self {
        Self { tab, event }
    }
}
