//! Presence domain entities.

pub mod model;

pub use model::{PresenceUpdate, PresenceView};

use serde::{Deserialize, Serialize};

/// Account-wide liveness signal. Last writer wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "presence_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PresenceStatus {
    /// A tab of the account is visible.
    Online,
    /// Tabs are open but none is visible.
    Away,
    /// No tab is open, or the last one was closed.
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Check if the account is considered online.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Return the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Away => "AWAY",
            Self::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = gatherly_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "AWAY" => Ok(Self::Away),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(gatherly_core::AppError::validation(format!(
                "Invalid presence status: '{s}'. Expected one of: ONLINE, AWAY, OFFLINE"
            ))),
        }
    }
}
