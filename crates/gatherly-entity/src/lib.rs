//! # gatherly-entity
//!
//! Domain models for Gatherly's session and presence subsystem. The
//! account row is owned by the wider application; this crate only models
//! the fields the session gate reads and the two it writes.

pub mod account;
pub mod presence;

pub use account::{Account, Identity};
pub use presence::{PresenceStatus, PresenceUpdate};
