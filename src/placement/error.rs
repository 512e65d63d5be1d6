//! Error types for placement.

use crate::framework::FrameworkError;
use thiserror::Error;

/// Reasons an activation request did not produce a process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivationError {
    /// The member was not set up to host this kind.
    #[error("Kind not hosted on this member: {0}")]
    UnknownKind(String),

    /// The runtime failed to start the backing process.
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    /// The placement actor has stopped or dropped the request.
    #[error("Placement actor stopped")]
    Stopped,

    /// No placement actor is registered under the target address.
    #[error("Placement actor unreachable: {0}")]
    Unreachable(String),

    #[error("Activation cancelled")]
    Cancelled,

    #[error("Activation timed out")]
    Timeout,
}

impl From<FrameworkError> for ActivationError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => ActivationError::Stopped,
            FrameworkError::Cancelled => ActivationError::Cancelled,
            FrameworkError::Timeout(_) => ActivationError::Timeout,
        }
    }
}
