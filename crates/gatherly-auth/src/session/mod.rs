//! Per-request session resolution and best-effort activity writes.

pub mod activity;
pub mod gate;
pub mod phase;

pub use activity::{ActivityRecorder, SideEffect, SideEffectFailure};
pub use gate::SessionGate;
pub use phase::SessionPhase;
