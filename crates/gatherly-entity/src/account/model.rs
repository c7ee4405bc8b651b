//! Account record as stored by the wider application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::presence::PresenceStatus;

/// A registered account.
///
/// The session subsystem reads the status flags and writes only
/// `presence_status`, `presence_updated_at` and `last_active_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
    /// Account has been activated and not deactivated.
    pub is_active: bool,
    /// Account has been banned by a moderator.
    pub is_banned: bool,
    /// Account is temporarily suspended.
    pub is_suspended: bool,
    /// Last written presence value.
    pub presence_status: PresenceStatus,
    /// When `presence_status` was last written.
    pub presence_updated_at: Option<DateTime<Utc>>,
    /// Last authenticated request.
    pub last_active_at: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh, active account with default presence, as registration creates it.
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            avatar_url: None,
            is_active: true,
            is_banned: false,
            is_suspended: false,
            presence_status: PresenceStatus::default(),
            presence_updated_at: None,
            last_active_at: None,
            created_at: Utc::now(),
        }
    }
}
