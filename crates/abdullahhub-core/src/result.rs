//! Convenience result type alias for AbdullahHub.

use crate::error::AppError;

/// A specialized `Result` type for AbdullahHub operations.
pub type AppResult<T> = Result<T, AppError>;
