//! # gatherly-auth
//!
//! Authentication for every protected Gatherly operation.
//!
//! ## Modules
//!
//! - `credential` — stateless signed credential issue/verify (HS256 JWT)
//! - `gate` — fresh account-status check (active / banned / suspended)
//! - `session` — per-request resolution combining both, plus best-effort
//!   activity writes that never fail the request

pub mod credential;
pub mod error;
pub mod gate;
pub mod session;

pub use credential::{Claims, Credential, CredentialCodec};
pub use error::AuthError;
pub use gate::AccountGate;
pub use session::{ActivityRecorder, SessionGate, SessionPhase};
