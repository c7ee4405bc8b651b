//! The stored credential used for every authenticated request.

use gatherly_core::result::AppResult;

use super::storage::SharedStorage;
use crate::event::TabId;

/// Profile storage slot holding the bearer credential.
#[derive(Debug, Clone)]
pub struct CredentialSlot {
    storage: SharedStorage,
    key: String,
    origin: TabId,
}

impl CredentialSlot {
    /// Slot under `key`, written on behalf of `origin`.
    pub fn new(storage: SharedStorage, key: impl Into<String>, origin: TabId) -> Self {
        Self {
            storage,
            key: key.into(),
            origin,
        }
    }

    /// The stored credential, if any.
    pub fn get(&self) -> Option<String> {
        self.storage.get(&self.key).filter(|t| !t.trim().is_empty())
    }

    /// Stores a credential handed out by login or registration.
    pub fn store(&self, token: &str) -> AppResult<()> {
        self.storage.set(self.origin, &self.key, token.trim())
    }

    /// Forgets the credential (logout, or after a 401).
    pub fn discard(&self) -> AppResult<()> {
        self.storage.remove(self.origin, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_discard() {
        let slot = CredentialSlot::new(SharedStorage::in_memory(), "auth_token", TabId::new());
        assert!(slot.get().is_none());

        slot.store(" token-value\n").unwrap();
        assert_eq!(slot.get().as_deref(), Some("token-value"));

        slot.discard().unwrap();
        assert!(slot.get().is_none());
    }
}
