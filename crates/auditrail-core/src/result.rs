//! Convenience result type alias for Auditrail.

use crate::error::AppError;

/// A specialized `Result` type for Auditrail operations.
pub type AppResult<T> = Result<T, AppError>;
