//! Error types for hook management operations.
//!
//! Missing hooks are not errors: repository lookups return `Option` and the
//! dispatcher reports not-found as an ordinary `Invocation` value. What
//! remains here is input validation and storage failure.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for hook operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The requested HTTP method is not in the hook allow-list.
    #[error("method {0:?} is not supported (allowed: GET, POST, PUT, PATCH, DELETE, OPTIONS)")]
    UnsupportedMethod(String),

    /// The backing store failed. Never produced by the in-memory registry.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Returns whether this error was caused by caller input.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::UnsupportedMethod(_))
    }
}
