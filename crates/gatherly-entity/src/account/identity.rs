//! Identity resolved from a verified credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Account;
use crate::presence::PresenceStatus;

/// The account as attached to an authenticated request and returned by
/// the verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Account ID.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
    /// `active` flag at resolution time.
    pub active: bool,
    /// `banned` flag at resolution time.
    pub banned: bool,
    /// `suspended` flag at resolution time.
    pub suspended: bool,
    /// Presence at resolution time.
    pub status: PresenceStatus,
    /// Last authenticated request before this one.
    pub last_active_at: Option<DateTime<Utc>>,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            avatar_url: account.avatar_url.clone(),
            active: account.is_active,
            banned: account.is_banned,
            suspended: account.is_suspended,
            status: account.presence_status,
            last_active_at: account.last_active_at,
        }
    }
}
