//! # gatherly-database
//!
//! The account store the session subsystem reads identities from and
//! stamps activity into. A PostgreSQL repository backs production; the
//! in-memory store backs development servers and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryAccountStore;
pub use repositories::account::{AccountRepository, AccountStore};
