//! # Identity Storage
//!
//! The durable mapping from cluster identity to activation record. It is the
//! single source of truth for activation ownership: every cross-member
//! decision goes through it.
//!
//! Backends implement [`IdentityStorage`]; [`InMemoryIdentityStorage`] is the
//! reference backend used by tests and the demo.
//!
//! ## Known eventual-consistency window
//!
//! [`IdentityStorage::remove_member`] may run concurrently with a
//! [`IdentityStorage::put_activation`] for the same, already departed, member.
//! Such a put can survive the bulk removal. The record is stale from birth and
//! is discarded by the next resolution of that identity, which cross-checks
//! the owner against the live membership.

pub mod memory;

pub use memory::*;

use crate::domain::{ActivationRecord, ClusterIdentity, ProcessId};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be reached. Retryable.
    #[error("Identity storage unavailable: {0}")]
    Unavailable(String),

    /// A record for the same identity already points at another process.
    #[error("Activation conflict for {}: held by {} on {}", .existing.cluster_identity, .existing.pid, .existing.member_id)]
    Conflict { existing: Box<ActivationRecord> },

    #[error("Storage operation cancelled")]
    Cancelled,
}

#[async_trait]
pub trait IdentityStorage: Send + Sync {
    /// Prepares the backing store (schema, indexes, connections).
    async fn init(&self, cancel: &CancellationToken) -> Result<(), StorageError>;

    async fn try_get_activation(
        &self,
        identity: &ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<ActivationRecord>, StorageError>;

    /// Stores `record`. Fails with [`StorageError::Conflict`] when a record for
    /// the same identity exists and names a different process; writing the
    /// same record again succeeds.
    async fn put_activation(
        &self,
        record: ActivationRecord,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;

    /// Removes the record naming `pid`. Absent records are not an error.
    async fn remove_activation(
        &self,
        pid: &ProcessId,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;

    /// Removes every record owned by `member_id`, returning how many were removed.
    async fn remove_member(
        &self,
        member_id: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, StorageError>;
}
