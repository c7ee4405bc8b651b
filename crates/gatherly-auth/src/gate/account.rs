//! Turns a verified account ID into an allow/deny decision.

use std::sync::Arc;

use uuid::Uuid;

use gatherly_database::AccountStore;
use gatherly_entity::account::{Account, Identity};

use crate::error::AuthError;

/// Loads the account fresh on every call and enforces its status flags.
///
/// Check order: existence, then `active`/`banned` together, then
/// `suspended`. A banned-and-suspended account reports the ban.
#[derive(Clone)]
pub struct AccountGate {
    store: Arc<dyn AccountStore>,
}

impl std::fmt::Debug for AccountGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountGate").finish()
    }
}

impl AccountGate {
    /// Creates a gate over the given account store.
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Resolves an identity, failing if the account is missing or barred.
    pub async fn resolve(&self, account_id: Uuid) -> Result<Identity, AuthError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::AccountNotFound)?;

        Self::check(&account)?;
        Ok(Identity::from(&account))
    }

    /// Applies the status rules to an already loaded account.
    pub fn check(account: &Account) -> Result<(), AuthError> {
        if !account.is_active || account.is_banned {
            return Err(AuthError::AccountInactiveOrBanned);
        }
        if account.is_suspended {
            return Err(AuthError::AccountSuspended);
        }
        Ok(())
    }
}
