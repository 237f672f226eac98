//! Convenience result type alias for Catwatch.

use crate::error::AppError;

/// A specialized `Result` type for Catwatch operations.
pub type AppResult<T> = Result<T, AppError>;
