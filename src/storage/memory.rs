//! In-process storage backend.

use super::{IdentityStorage, StorageError};
use crate::domain::{ActivationRecord, ClusterIdentity, ProcessId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Activation records kept in a `HashMap` behind a mutex.
///
/// Every operation checks the cancellation token before touching the map and
/// then completes atomically, so a cancelled call never leaves a partial write.
#[derive(Debug)]
pub struct InMemoryIdentityStorage {
    records: Mutex<HashMap<ClusterIdentity, ActivationRecord>>,
    available: AtomicBool,
}

impl Default for InMemoryIdentityStorage {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryIdentityStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backend going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<ActivationRecord> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ClusterIdentity, ActivationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, cancel: &CancellationToken) -> Result<(), StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory backend switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStorage for InMemoryIdentityStorage {
    async fn init(&self, cancel: &CancellationToken) -> Result<(), StorageError> {
        self.check(cancel)
    }

    async fn try_get_activation(
        &self,
        identity: &ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<ActivationRecord>, StorageError> {
        self.check(cancel)?;
        Ok(self.lock().get(identity).cloned())
    }

    async fn put_activation(
        &self,
        record: ActivationRecord,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        self.check(cancel)?;
        let mut records = self.lock();
        if let Some(existing) = records.get(&record.cluster_identity) {
            if existing.pid != record.pid {
                return Err(StorageError::Conflict {
                    existing: Box::new(existing.clone()),
                });
            }
        }
        debug!(identity = %record.cluster_identity, pid = %record.pid, member_id = %record.member_id, "Stored activation");
        records.insert(record.cluster_identity.clone(), record);
        Ok(())
    }

    async fn remove_activation(
        &self,
        pid: &ProcessId,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        self.check(cancel)?;
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| &record.pid != pid);
        debug!(%pid, removed = before - records.len(), "Removed activation");
        Ok(())
    }

    async fn remove_member(
        &self,
        member_id: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, StorageError> {
        self.check(cancel)?;
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| record.member_id != member_id);
        let removed = before - records.len();
        debug!(member_id, removed, "Removed member activations");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, member: &str) -> ActivationRecord {
        let identity = ClusterIdentity::new("Order", name);
        let pid = ProcessId::new(member, format!("placement-activator/Order${name}"));
        ActivationRecord::new(identity, pid, member)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let storage = InMemoryIdentityStorage::new();
        let cancel = CancellationToken::new();
        let r = record("order-42", "A");

        storage.put_activation(r.clone(), &cancel).await.unwrap();

        let found = storage
            .try_get_activation(&r.cluster_identity, &cancel)
            .await
            .unwrap();
        assert_eq!(found, Some(r));
    }

    #[tokio::test]
    async fn test_put_for_other_process_conflicts() {
        let storage = InMemoryIdentityStorage::new();
        let cancel = CancellationToken::new();
        let on_a = record("order-42", "A");
        let on_b = record("order-42", "B");

        storage.put_activation(on_a.clone(), &cancel).await.unwrap();
        // Same record again is fine.
        storage.put_activation(on_a.clone(), &cancel).await.unwrap();

        let result = storage.put_activation(on_b, &cancel).await;
        assert_eq!(
            result,
            Err(StorageError::Conflict {
                existing: Box::new(on_a)
            })
        );
    }

    #[tokio::test]
    async fn test_remove_activation_by_pid_is_idempotent() {
        let storage = InMemoryIdentityStorage::new();
        let cancel = CancellationToken::new();
        let r = record("order-42", "A");
        storage.put_activation(r.clone(), &cancel).await.unwrap();

        storage.remove_activation(&r.pid, &cancel).await.unwrap();
        storage.remove_activation(&r.pid, &cancel).await.unwrap();

        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_remove_member_only_touches_that_member() {
        let storage = InMemoryIdentityStorage::new();
        let cancel = CancellationToken::new();
        for (name, member) in [("1", "A"), ("2", "A"), ("3", "B")] {
            storage.put_activation(record(name, member), &cancel).await.unwrap();
        }

        let removed = storage.remove_member("A", &cancel).await.unwrap();

        assert_eq!(removed, 2);
        let left: Vec<_> = storage.records().into_iter().map(|r| r.member_id).collect();
        assert_eq!(left, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_put_writes_nothing() {
        let storage = InMemoryIdentityStorage::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = storage.put_activation(record("order-42", "A"), &cancel).await;

        assert_eq!(result, Err(StorageError::Cancelled));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_every_operation() {
        let storage = InMemoryIdentityStorage::new();
        storage.set_available(false);
        let cancel = CancellationToken::new();

        assert!(matches!(storage.init(&cancel).await, Err(StorageError::Unavailable(_))));
        assert!(matches!(
            storage.remove_member("A", &cancel).await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
