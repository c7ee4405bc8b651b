//! Presence value objects exchanged over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PresenceStatus;

/// Body of a presence write, sent on heartbeats, lifecycle events and
/// the unload-time beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    /// Account the status belongs to.
    pub account_id: Uuid,
    /// New status.
    pub status: PresenceStatus,
}

/// Presence of one account as seen by another caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    /// Account ID.
    pub account_id: Uuid,
    /// Most recently written status.
    pub status: PresenceStatus,
    /// When the status was last written.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last authenticated request by the account.
    pub last_active_at: Option<DateTime<Utc>>,
    /// Whether the caller is looking at their own account.
    pub is_self: bool,
}
