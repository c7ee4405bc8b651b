//! Authentication failure taxonomy.

use thiserror::Error;

use gatherly_core::error::{AppError, ErrorKind};

/// Why a protected request was not allowed to reach its handler.
///
/// None of these are retried: they mean either the client must
/// re-authenticate or the operator must fix the deployment.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential on the request.
    #[error("Missing credential")]
    NoCredential,
    /// Malformed, tampered or expired credential.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    /// The credential names an account that no longer exists.
    #[error("Account not found")]
    AccountNotFound,
    /// The account is deactivated or banned.
    #[error("Account is inactive or banned")]
    AccountInactiveOrBanned,
    /// The account is temporarily suspended.
    #[error("Account is suspended")]
    AccountSuspended,
    /// The signing secret is missing.
    #[error("Credential signing is not configured: {0}")]
    Configuration(String),
    /// The account store failed while resolving the identity.
    #[error("Account store failure: {0}")]
    Store(#[source] AppError),
}

impl AuthError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoCredential => "NO_CREDENTIAL",
            Self::InvalidCredential(_) => "INVALID_CREDENTIAL",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::AccountInactiveOrBanned => "ACCOUNT_INACTIVE_OR_BANNED",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Error category, which decides the HTTP status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredential | Self::InvalidCredential(_) | Self::AccountNotFound => {
                ErrorKind::Authentication
            }
            Self::AccountInactiveOrBanned | Self::AccountSuspended => ErrorKind::Authorization,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::new(err.kind(), err.to_string())
    }
}
