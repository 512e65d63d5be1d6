//! Error types for the identity lookup.

use crate::storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the identity lookup.
///
/// "No activation could be established" is not an error: `resolve` returns
/// `Ok(None)` for it. `Timeout` and `Cancelled` mean the operation did not
/// complete, which is a different answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Setup could not initialize identity storage.
    #[error("Identity lookup initialization failed: {0}")]
    Initialization(StorageError),

    /// Identity storage could not be reached. Retryable.
    #[error("Identity storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Identity lookup is not set up")]
    NotSetUp,

    #[error("Identity lookup is shut down")]
    Shutdown,

    /// Kinds end up inside process ids and may not contain `'$'` or `'/'`.
    #[error("Invalid kind: {0:?}")]
    InvalidKind(String),
}

impl From<StorageError> for LookupError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Cancelled => LookupError::Cancelled,
            // Conflicts are consumed by the identity worker before they get here.
            other => LookupError::StorageUnavailable(other.to_string()),
        }
    }
}
