//! Account store trait and its PostgreSQL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatherly_core::error::{AppError, ErrorKind};
use gatherly_core::result::AppResult;
use gatherly_entity::account::Account;
use gatherly_entity::presence::PresenceStatus;

/// The external account store as seen by the session subsystem.
///
/// Reads are always fresh: implementations must not cache records, so a
/// ban applied between two requests is observed by the second one.
#[async_trait]
pub trait AccountStore: Send + Sync + std::fmt::Debug + 'static {
    /// Load an account by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Record that the account made an authenticated request at `at`.
    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Write the account's presence as of `at`.
    ///
    /// A write older than the stored `presence_updated_at` is dropped and
    /// `Ok(false)` returned, so writes that land out of order cannot undo a
    /// later one.
    async fn set_presence(
        &self,
        id: Uuid,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// PostgreSQL-backed account store.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ensure_updated(rows: u64, id: Uuid) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::not_found(format!("Account {id} not found")));
    }
    Ok(())
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, display_name, avatar_url, is_active, is_banned, is_suspended, \
             presence_status, presence_updated_at, last_active_at, created_at \
             FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find account by id", e))
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query("UPDATE accounts SET last_active_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to stamp last activity", e)
            })?;

        ensure_updated(result.rows_affected(), id)
    }

    async fn set_presence(
        &self,
        id: Uuid,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET presence_status = $2, presence_updated_at = $3 \
             WHERE id = $1 AND (presence_updated_at IS NULL OR presence_updated_at <= $3)",
        )
        .bind(id)
        .bind(status)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update presence", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing updated: either superseded or the account is gone.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check account existence", e)
            })?;
        if !exists {
            return Err(AppError::not_found(format!("Account {id} not found")));
        }
        Ok(false)
    }
}
