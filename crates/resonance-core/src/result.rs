//! Convenience result type alias for Resonance.

use crate::error::AppError;

/// A specialized `Result` type for Resonance operations.
///
/// Every crate in the workspace returns this so that plugin hooks, command
/// handlers, and host code all speak the same error type.
pub type AppResult<T> = Result<T, AppError>;
