//! # gatherly-presence
//!
//! Client-side presence reporting for one browser profile.
//!
//! ## Modules
//!
//! - `event` — tab identifiers and lifecycle events
//! - `machine` — pure ONLINE/AWAY/OFFLINE derivation across the profile's tabs
//! - `leader` — named locks (in-process or file-backed) so one agent per account reports at a time
//! - `broadcast` — profile-scoped storage, cross-tab status mirror, credential slot
//! - `transport` — how updates reach the server (normal requests and beacons)
//! - `agent` — the task tying it all together

pub mod agent;
pub mod broadcast;
pub mod event;
pub mod leader;
pub mod machine;
pub mod transport;

pub use agent::{AgentExit, PresenceAgent};
pub use broadcast::{CredentialSlot, PresenceBroadcaster, PresenceObserver, SharedStorage};
pub use event::{LifecycleEvent, TabEvent, TabId};
pub use leader::LockManager;
pub use machine::{Delivery, Emission, PresenceMachine};
pub use transport::{HttpTransport, PresenceTransport};
