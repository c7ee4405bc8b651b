//! Best-effort account writes: last-active stamping and presence updates.
//!
//! Each write runs as a detached task. Failures are sent over a channel to
//! a logging task and never joined into the caller's result.
//!
//! Presence writes are stamped when they are recorded, not when their task
//! runs. The store drops a write older than the one it holds, so a slow
//! task cannot undo an update that arrived after it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use gatherly_core::error::AppError;
use gatherly_database::AccountStore;
use gatherly_entity::presence::PresenceStatus;

/// Which best-effort write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// `lastActiveAt` stamp after a successful authentication.
    LastActive,
    /// Presence write from a heartbeat or lifecycle event.
    Presence(PresenceStatus),
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastActive => write!(f, "last_active"),
            Self::Presence(status) => write!(f, "presence:{status}"),
        }
    }
}

/// A failed best-effort write.
#[derive(Debug, Clone)]
pub struct SideEffectFailure {
    /// What was being written.
    pub effect: SideEffect,
    /// Account the write targeted.
    pub account_id: Uuid,
    /// Store error.
    pub error: AppError,
}

/// Dispatches fire-and-forget writes against the account store.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<dyn AccountStore>,
    failures: mpsc::UnboundedSender<SideEffectFailure>,
    /// Microseconds of the last presence stamp handed out.
    presence_clock: Arc<AtomicI64>,
}

impl fmt::Debug for ActivityRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRecorder").finish()
    }
}

impl ActivityRecorder {
    /// Creates a recorder whose failures are logged by a spawned task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(store: Arc<dyn AccountStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(log_failures(rx));
        Self::with_failure_channel(store, tx)
    }

    /// Creates a recorder that reports failures to `failures`.
    pub fn with_failure_channel(
        store: Arc<dyn AccountStore>,
        failures: mpsc::UnboundedSender<SideEffectFailure>,
    ) -> Self {
        Self {
            store,
            failures,
            presence_clock: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Stamps `lastActiveAt = now` for the account.
    ///
    /// The returned handle may be dropped; the write proceeds regardless.
    pub fn stamp_last_active(&self, account_id: Uuid) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        self.dispatch(SideEffect::LastActive, account_id, async move {
            store.touch_last_active(account_id, Utc::now()).await
        })
    }

    /// Writes the account's presence status, stamped with the time of this call.
    ///
    /// Successive calls get strictly increasing stamps, so of two updates the
    /// one recorded last is the one that stays.
    pub fn record_presence(&self, account_id: Uuid, status: PresenceStatus) -> JoinHandle<()> {
        let at = self.presence_stamp();
        let store = Arc::clone(&self.store);
        self.dispatch(SideEffect::Presence(status), account_id, async move {
            if !store.set_presence(account_id, status, at).await? {
                debug!(account_id = %account_id, status = %status, "Presence write superseded");
            }
            Ok(())
        })
    }

    /// Wall-clock now, bumped past the previous stamp when the clock has not
    /// advanced. Microsecond resolution matches `timestamptz`.
    fn presence_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let previous = match self.presence_clock.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |last| Some(now.max(last + 1)),
        ) {
            Ok(previous) | Err(previous) => previous,
        };
        DateTime::from_timestamp_micros(now.max(previous + 1)).unwrap_or_else(Utc::now)
    }

    fn dispatch<F>(&self, effect: SideEffect, account_id: Uuid, write: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let failures = self.failures.clone();
        tokio::spawn(async move {
            match write.await {
                Ok(()) => debug!(account_id = %account_id, effect = %effect, "Best-effort write applied"),
                Err(error) => {
                    let _ = failures.send(SideEffectFailure {
                        effect,
                        account_id,
                        error,
                    });
                }
            }
        })
    }
}

async fn log_failures(mut rx: mpsc::UnboundedReceiver<SideEffectFailure>) {
    while let Some(failure) = rx.recv().await {
        warn!(
            account_id = %failure.account_id,
            effect = %failure.effect,
            error = %failure.error,
            "Best-effort write failed"
        );
    }
}
