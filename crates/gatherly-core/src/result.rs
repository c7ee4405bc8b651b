//! Convenience result type alias for Gatherly.

use crate::error::AppError;

/// A specialized `Result` type for Gatherly operations.
pub type AppResult<T> = Result<T, AppError>;
