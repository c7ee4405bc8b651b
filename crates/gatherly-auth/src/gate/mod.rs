//! Account status gate.

pub mod account;

pub use account::AccountGate;
