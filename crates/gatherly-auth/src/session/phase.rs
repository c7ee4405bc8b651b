//! Per-request authentication phases. Never persisted.

use std::fmt;

use tracing::debug;

/// Where a request currently is on its way to the handler.
///
/// Happy path: `NoToken -> Verifying -> Verified -> Resolving -> Resolved
/// -> Handling`. Any non-terminal phase may exit to `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing extracted yet.
    NoToken,
    /// Checking signature and expiry.
    Verifying,
    /// Credential is authentic; account ID known.
    Verified,
    /// Loading the account and checking its flags.
    Resolving,
    /// Identity resolved and allowed.
    Resolved,
    /// The wrapped handler is running.
    Handling,
    /// Denied; carries the error code.
    Rejected(&'static str),
}

impl SessionPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Handling | Self::Rejected(_))
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        match (self, next) {
            (_, _) if self.is_terminal() => false,
            (_, Rejected(_)) => true,
            (NoToken, Verifying)
            | (Verifying, Verified)
            | (Verified, Resolving)
            | (Resolving, Resolved)
            | (Resolved, Handling) => true,
            _ => false,
        }
    }
}

impl SessionPhase {
    /// Moves to `next`, logging the transition. Returns `next`.
    pub fn enter(self, next: SessionPhase) -> SessionPhase {
        debug_assert!(self.can_advance_to(next), "{self} -> {next}");
        debug!(from = %self, to = %next, "Session phase");
        next
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => write!(f, "no_token"),
            Self::Verifying => write!(f, "verifying"),
            Self::Verified => write!(f, "verified"),
            Self::Resolving => write!(f, "resolving"),
            Self::Resolved => write!(f, "resolved"),
            Self::Handling => write!(f, "handling"),
            Self::Rejected(code) => write!(f, "rejected({code})"),
        }
    }
}
