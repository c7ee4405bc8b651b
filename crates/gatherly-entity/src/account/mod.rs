//! Account domain entities.

pub mod identity;
pub mod model;

pub use identity::Identity;
pub use model::Account;
