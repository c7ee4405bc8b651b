//! The per-profile presence task.
//!
//! Lifecycle:
//!
//! 1. Verify the stored credential. Without one the agent exits before
//!    doing anything else.
//! 2. Wait for the account's presence lock. Events seen while waiting
//!    update the machine silently; the derived status is emitted once the
//!    lock is won.
//! 3. Loop over tab events and the heartbeat until the last tab closes.
//! 4. Let queued sends finish (bounded), then send the final OFFLINE as a
//!    beacon. If a standby agent is waiting for the lock, its tabs are
//!    still open: skip OFFLINE and let it report instead.
//!
//! Every emission is mirrored to sibling tabs first, then sent. Normal
//! sends go through a detached outbox in emission order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use gatherly_entity::presence::PresenceUpdate;

use crate::broadcast::PresenceBroadcaster;
use crate::event::TabEvent;
use crate::leader::{LockManager, presence_lock_name};
use crate::machine::{Delivery, Emission, PresenceMachine};
use crate::transport::PresenceTransport;

const DEFAULT_OUTBOX_DRAIN: Duration = Duration::from_secs(2);

/// Why [`PresenceAgent::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// No usable credential; tracking never started.
    NotAuthenticated,
    /// The presence lock could not be taken.
    LockUnavailable,
    /// Every tab closed.
    Closed,
}

/// Reports the profile's presence for one account.
pub struct PresenceAgent<T: PresenceTransport> {
    transport: Arc<T>,
    broadcaster: PresenceBroadcaster,
    locks: LockManager,
    heartbeat: Duration,
    outbox_drain: Duration,
}

impl<T: PresenceTransport> PresenceAgent<T> {
    /// Creates an agent.
    pub fn new(
        transport: Arc<T>,
        broadcaster: PresenceBroadcaster,
        locks: LockManager,
        heartbeat: Duration,
    ) -> Self {
        Self {
            transport,
            broadcaster,
            locks,
            heartbeat,
            outbox_drain: DEFAULT_OUTBOX_DRAIN,
        }
    }

    /// Caps how long closing waits for queued sends before the final beacon.
    pub fn with_outbox_drain(mut self, limit: Duration) -> Self {
        self.outbox_drain = limit;
        self
    }

    /// Runs until every tab has closed or the event channel is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<TabEvent>) -> AgentExit {
        let identity = match self.transport.verify().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Presence tracking not started");
                return AgentExit::NotAuthenticated;
            }
        };
        let account_id = identity.id;
        let mut machine = PresenceMachine::new();

        let lock_name = presence_lock_name(account_id);
        let acquire = self.locks.acquire(&lock_name);
        tokio::pin!(acquire);
        let _leader = loop {
            tokio::select! {
                biased;
                guard = &mut acquire => match guard {
                    Ok(guard) => break guard,
                    Err(e) => {
                        error!(account_id = %account_id, error = %e, "Presence lock unavailable");
                        return AgentExit::LockUnavailable;
                    }
                },
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!(account_id = %account_id, "Standby agent closed");
                        return AgentExit::Closed;
                    };
                    machine.apply(event);
                    if machine.is_closed() {
                        debug!(account_id = %account_id, "Standby agent's tabs closed");
                        return AgentExit::Closed;
                    }
                }
            }
        };
        info!(account_id = %account_id, "Presence reporting started");

        let mut outbox = Outbox::spawn(Arc::clone(&self.transport));
        if let Some(status) = machine.derived() {
            let emission = Emission {
                status,
                delivery: Delivery::Request,
            };
            self.emit(&outbox, account_id, emission);
        }

        let mut heartbeat = interval_at(Instant::now() + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let last = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break machine.shutdown();
                    };
                    match machine.apply(event) {
                        Some(emission) if emission.delivery == Delivery::Beacon => break Some(emission),
                        Some(emission) => self.emit(&outbox, account_id, emission),
                        None => {}
                    }
                    if machine.is_closed() {
                        break None;
                    }
                }
                _ = heartbeat.tick() => {
                    if let Some(emission) = machine.heartbeat() {
                        self.emit(&outbox, account_id, emission);
                    }
                }
            }
        };

        if !outbox.drain(self.outbox_drain).await {
            warn!(account_id = %account_id, "Queued presence updates still in flight at close");
        }
        if let Some(emission) = last {
            if self.locks.has_waiters(&lock_name) {
                info!(account_id = %account_id, "Handing presence reporting to a standby agent");
            } else {
                self.emit(&outbox, account_id, emission);
            }
        }

        info!(account_id = %account_id, "Presence reporting stopped");
        AgentExit::Closed
    }

    fn emit(&self, outbox: &Outbox, account_id: Uuid, emission: Emission) {
        if let Err(e) = self.broadcaster.publish(emission.status) {
            warn!(error = %e, "Could not mirror presence to sibling tabs");
        }

        let update = PresenceUpdate {
            account_id,
            status: emission.status,
        };
        debug!(status = %update.status, delivery = ?emission.delivery, "Presence emitted");
        match emission.delivery {
            Delivery::Beacon => self.transport.beacon(update),
            Delivery::Request => outbox.push(update),
        }
    }
}

/// Sends updates in order on a task detached from the agent.
///
/// Failures, including a rejected credential, are logged and the next
/// update is still attempted.
struct Outbox {
    tx: Option<mpsc::UnboundedSender<PresenceUpdate>>,
    task: Option<JoinHandle<()>>,
}

impl Outbox {
    fn spawn<T: PresenceTransport>(transport: Arc<T>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PresenceUpdate>();
        let task = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if let Err(e) = transport.send_presence(update).await {
                    if e.is_authentication() {
                        warn!(status = %update.status, error = %e, "Presence rejected; credential no longer valid");
                    } else {
                        warn!(status = %update.status, error = %e, "Presence update failed");
                    }
                }
            }
        });
        Self {
            tx: Some(tx),
            task: Some(task),
        }
    }

    fn push(&self, update: PresenceUpdate) {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(update).is_ok());
        if !sent {
            warn!(status = %update.status, "Presence outbox closed");
        }
    }

    /// Stops taking updates and waits up to `limit` for queued ones to finish.
    ///
    /// Returns `false` if the limit passed first; the sends keep running.
    async fn drain(&mut self, limit: Duration) -> bool {
        self.tx = None;
        let Some(task) = self.task.take() else {
            return true;
        };
        tokio::time::timeout(limit, task).await.is_ok()
    }
}
