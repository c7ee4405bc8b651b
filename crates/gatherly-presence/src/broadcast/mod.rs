//! Profile-scoped storage and the cross-tab presence mirror.

pub mod broadcaster;
pub mod credential;
pub mod storage;

pub use broadcaster::{PresenceBroadcaster, PresenceObserver};
pub use credential::CredentialSlot;
pub use storage::{ProfileWatcher, SharedStorage, StorageEvent, StorageListener};
