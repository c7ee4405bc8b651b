//! In-memory account store for single-node development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use gatherly_core::error::AppError;
use gatherly_core::result::AppResult;
use gatherly_entity::account::Account;
use gatherly_entity::presence::PresenceStatus;

use crate::repositories::account::AccountStore;

/// Account store backed by a concurrent map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<DashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account, returning its ID.
    pub fn insert(&self, account: Account) -> Uuid {
        let id = account.id;
        self.accounts.insert(id, account);
        id
    }

    /// Snapshot of an account, bypassing the async trait.
    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.get(&id).map(|r| r.value().clone())
    }

    /// Sets the `banned` flag. Returns `false` if the account does not exist.
    pub fn set_banned(&self, id: Uuid, banned: bool) -> bool {
        self.modify(id, |a| a.is_banned = banned)
    }

    /// Sets the `suspended` flag.
    pub fn set_suspended(&self, id: Uuid, suspended: bool) -> bool {
        self.modify(id, |a| a.is_suspended = suspended)
    }

    /// Sets the `active` flag.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        self.modify(id, |a| a.is_active = active)
    }

    /// Removes an account entirely.
    pub fn remove(&self, id: Uuid) -> Option<Account> {
        self.accounts.remove(&id).map(|(_, a)| a)
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut Account)) -> bool {
        match self.accounts.get_mut(&id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    fn missing(id: Uuid) -> AppError {
        AppError::not_found(format!("Account {id} not found"))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.get(id))
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if self.modify(id, |a| a.last_active_at = Some(at)) {
            Ok(())
        } else {
            Err(Self::missing(id))
        }
    }

    async fn set_presence(
        &self,
        id: Uuid,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut applied = false;
        let found = self.modify(id, |a| {
            if a.presence_updated_at.is_none_or(|stored| stored <= at) {
                a.presence_status = status;
                a.presence_updated_at = Some(at);
                applied = true;
            }
        });
        if found { Ok(applied) } else { Err(Self::missing(id)) }
    }
}
