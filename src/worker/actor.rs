//! # Identity Worker
//!
//! A pooled actor that turns a cluster identity into a process id. Workers
//! keep no state between requests; everything they know comes from identity
//! storage and the membership view at the time of the request.
//!
//! Requests for one identity always land on the same worker (see
//! [`ConsistentHashRouter`](crate::routing::ConsistentHashRouter)) and a worker
//! handles one request at a time, so storage writes for an identity are
//! issued from a single place on each member without any lock.

use super::client::WorkerClient;
use crate::cluster::{MemberList, PlacementTransport};
use crate::domain::{ActivationRecord, ClusterIdentity, ProcessId};
use crate::framework::Response;
use crate::lookup::LookupError;
use crate::placement::{remote_placement_actor, ActivationError};
use crate::routing::elect_owner;
use crate::storage::{IdentityStorage, StorageError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Messages understood by an identity worker.
#[derive(Debug)]
pub enum WorkerRequest {
    Resolve {
        identity: ClusterIdentity,
        cancel: CancellationToken,
        respond_to: Response<Result<Option<ProcessId>, LookupError>>,
    },
}

/// Dependencies injected into every worker of a pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub storage: Arc<dyn IdentityStorage>,
    pub member_list: MemberList,
    pub transport: Arc<dyn PlacementTransport>,
    pub max_conflict_retries: u32,
}

pub struct IdentityWorker {
    receiver: mpsc::Receiver<WorkerRequest>,
    slot: usize,
}

impl IdentityWorker {
    pub fn new(buffer_size: usize, slot: usize) -> (Self, WorkerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { receiver, slot }, WorkerClient::new(sender))
    }

    pub async fn run(mut self, context: WorkerContext) {
        let slot = self.slot;
        debug!(slot, "Worker started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                WorkerRequest::Resolve {
                    identity,
                    cancel,
                    respond_to,
                } => {
                    if respond_to.is_closed() {
                        debug!(slot, %identity, "Caller gone, skipping");
                        continue;
                    }
                    // Dropping the in-flight future abandons whatever storage
                    // or placement call it is waiting on.
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(LookupError::Cancelled),
                        result = resolve(&context, &identity, &cancel) => result,
                    };
                    match &result {
                        Ok(Some(pid)) => debug!(slot, %identity, %pid, "Resolved"),
                        Ok(None) => debug!(slot, %identity, "No activation"),
                        Err(e) => debug!(slot, %identity, error = %e, "Resolve failed"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        debug!(slot, "Worker stopped");
    }
}

/// Storage lookup, liveness cross-check, placement and record write for one
/// identity.
async fn resolve(
    context: &WorkerContext,
    identity: &ClusterIdentity,
    cancel: &CancellationToken,
) -> Result<Option<ProcessId>, LookupError> {
    let mut conflicts = 0;

    loop {
        if let Some(record) = context.storage.try_get_activation(identity, cancel).await? {
            if context.member_list.contains(&record.member_id) {
                return Ok(Some(record.pid));
            }
            info!(%identity, pid = %record.pid, member_id = %record.member_id, "Discarding activation owned by departed member");
            context.storage.remove_activation(&record.pid, cancel).await?;
        }

        let members = context.member_list.members();
        let Some(owner) = elect_owner(identity, &members) else {
            warn!(%identity, "No member hosts this kind");
            return Ok(None);
        };

        let target = remote_placement_actor(&owner.address);
        let pid = match context
            .transport
            .activate(&target, identity.clone(), cancel)
            .await
        {
            Ok(pid) => pid,
            Err(ActivationError::Cancelled) => return Err(LookupError::Cancelled),
            Err(e) => {
                warn!(%identity, member_id = %owner.id, error = %e, "Placement rejected");
                return Ok(None);
            }
        };

        // A record may only exist for a placement whose success we observed
        // within the caller's deadline.
        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }

        let record = ActivationRecord::new(identity.clone(), pid.clone(), owner.id.clone());
        match context.storage.put_activation(record, cancel).await {
            Ok(()) => {
                info!(%identity, %pid, member_id = %owner.id, "Activation stored");
                return Ok(Some(pid));
            }
            Err(StorageError::Conflict { existing }) => {
                if conflicts >= context.max_conflict_retries {
                    warn!(%identity, existing = %existing.pid, conflicts, "Giving up after repeated conflicts");
                    return Ok(context
                        .member_list
                        .contains(&existing.member_id)
                        .then(|| existing.pid.clone()));
                }
                conflicts += 1;
                debug!(%identity, existing = %existing.pid, conflicts, "Conflict, resolving again");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;
    use crate::framework::mock::MockTransport;
    use crate::storage::InMemoryIdentityStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Storage where `competitor` is written by someone else right before our
    /// first put lands.
    struct CompetingWrite {
        inner: InMemoryIdentityStorage,
        competitor: Mutex<Option<ActivationRecord>>,
    }

    impl CompetingWrite {
        fn new(competitor: ActivationRecord) -> Self {
            Self {
                inner: InMemoryIdentityStorage::new(),
                competitor: Mutex::new(Some(competitor)),
            }
        }
    }

    #[async_trait]
    impl IdentityStorage for CompetingWrite {
        async fn init(&self, cancel: &CancellationToken) -> Result<(), StorageError> {
            self.inner.init(cancel).await
        }

        async fn try_get_activation(
            &self,
            identity: &ClusterIdentity,
            cancel: &CancellationToken,
        ) -> Result<Option<ActivationRecord>, StorageError> {
            self.inner.try_get_activation(identity, cancel).await
        }

        async fn put_activation(
            &self,
            record: ActivationRecord,
            cancel: &CancellationToken,
        ) -> Result<(), StorageError> {
            let competitor = self.competitor.lock().unwrap().take();
            if let Some(competitor) = competitor {
                self.inner.put_activation(competitor, cancel).await?;
            }
            self.inner.put_activation(record, cancel).await
        }

        async fn remove_activation(
            &self,
            pid: &ProcessId,
            cancel: &CancellationToken,
        ) -> Result<(), StorageError> {
            self.inner.remove_activation(pid, cancel).await
        }

        async fn remove_member(
            &self,
            member_id: &str,
            cancel: &CancellationToken,
        ) -> Result<usize, StorageError> {
            self.inner.remove_member(member_id, cancel).await
        }
    }

    fn competing(storage: &Arc<CompetingWrite>, retries: u32, transport: &MockTransport) -> WorkerContext {
        WorkerContext {
            storage: storage.clone(),
            member_list: members(),
            transport: Arc::new(transport.clone()),
            max_conflict_retries: retries,
        }
    }

    fn members() -> MemberList {
        MemberList::new(vec![
            Member::new("A", "A", &["Order"]),
            Member::new("B", "B", &["Order"]),
        ])
    }

    fn order_42() -> ClusterIdentity {
        ClusterIdentity::new("Order", "order-42")
    }

    fn owner_of(identity: &ClusterIdentity, list: &MemberList) -> Member {
        elect_owner(identity, &list.members()).unwrap().clone()
    }

    fn context(
        storage: Arc<InMemoryIdentityStorage>,
        member_list: MemberList,
        transport: &MockTransport,
    ) -> WorkerContext {
        WorkerContext {
            storage,
            member_list,
            transport: Arc::new(transport.clone()),
            max_conflict_retries: 2,
        }
    }

    fn start(context: WorkerContext) -> (WorkerClient, tokio::task::JoinHandle<()>) {
        let (worker, client) = IdentityWorker::new(8, 0);
        (client, tokio::spawn(worker.run(context)))
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_places_on_elected_owner_and_stores_record() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let list = members();
        let owner = owner_of(&order_42(), &list);
        let pid = ProcessId::new(&owner.address, "placement-activator/Order$order-42");

        let mut transport = MockTransport::new();
        transport.expect_activate(&owner.address).return_ok(pid.clone());

        let (client, handle) = start(context(storage.clone(), list, &transport));
        let cancel = CancellationToken::new();

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();

        assert_eq!(resolved, Some(pid.clone()));
        assert_eq!(storage.records(), vec![ActivationRecord::new(order_42(), pid, owner.id)]);
        transport.verify();

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_existing_live_record_skips_placement() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let cancel = CancellationToken::new();
        let pid = ProcessId::new("B", "placement-activator/Order$order-42");
        storage
            .put_activation(ActivationRecord::new(order_42(), pid.clone(), "B"), &cancel)
            .await
            .unwrap();

        // No expectations: any placement call would panic the mock.
        let transport = MockTransport::new();
        let (client, handle) = start(context(storage, members(), &transport));

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();
        assert_eq!(resolved, Some(pid));
        assert_eq!(transport.activate_calls(), 0);

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_record_of_departed_member_is_replaced() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let cancel = CancellationToken::new();
        let stale = ProcessId::new("gone", "placement-activator/Order$order-42");
        storage
            .put_activation(ActivationRecord::new(order_42(), stale, "gone"), &cancel)
            .await
            .unwrap();

        let list = members();
        let owner = owner_of(&order_42(), &list);
        let fresh = ProcessId::new(&owner.address, "placement-activator/Order$order-42");
        let mut transport = MockTransport::new();
        transport.expect_activate(&owner.address).return_ok(fresh.clone());

        let (client, handle) = start(context(storage.clone(), list, &transport));

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();
        assert_eq!(resolved, Some(fresh));
        assert_eq!(storage.records().len(), 1);
        assert_eq!(storage.records()[0].member_id, owner.id);
        transport.verify();

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_placement_is_not_found_and_writes_nothing() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let list = members();
        let owner = owner_of(&order_42(), &list);
        let mut transport = MockTransport::new();
        transport
            .expect_activate(&owner.address)
            .return_err(ActivationError::SpawnFailed("boom".into()));

        let (client, handle) = start(context(storage.clone(), list, &transport));
        let cancel = CancellationToken::new();

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();
        assert_eq!(resolved, None);
        assert!(storage.is_empty());

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_eligible_member_is_not_found() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let transport = MockTransport::new();
        let (client, handle) = start(context(storage, members(), &transport));
        let cancel = CancellationToken::new();

        let resolved = client
            .resolve(ClusterIdentity::new("Cart", "cart-1"), &cancel, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(resolved, None);

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_placement_persists_nothing() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let list = members();
        let owner = owner_of(&order_42(), &list);
        let pid = ProcessId::new(&owner.address, "placement-activator/Order$order-42");
        let mut transport = MockTransport::new();
        transport
            .expect_activate(&owner.address)
            .delay(Duration::from_millis(200))
            .return_ok(pid);

        let (client, handle) = start(context(storage.clone(), list, &transport));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = client.resolve(order_42(), &cancel, TIMEOUT).await;
        assert_eq!(result, Err(LookupError::Cancelled));

        // Give the worker time to finish whatever it would have done.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(storage.is_empty());

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_and_persists_nothing() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let list = members();
        let owner = owner_of(&order_42(), &list);
        let pid = ProcessId::new(&owner.address, "placement-activator/Order$order-42");
        let mut transport = MockTransport::new();
        transport
            .expect_activate(&owner.address)
            .delay(Duration::from_millis(200))
            .return_ok(pid);

        let (client, handle) = start(context(storage.clone(), list, &transport));
        let cancel = CancellationToken::new();
        let timeout = Duration::from_millis(20);

        let result = client.resolve(order_42(), &cancel, timeout).await;
        assert_eq!(result, Err(LookupError::Timeout(timeout)));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(storage.is_empty());

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_storage_outage_is_surfaced() {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        storage.set_available(false);
        let transport = MockTransport::new();
        let (client, handle) = start(context(storage, members(), &transport));
        let cancel = CancellationToken::new();

        let result = client.resolve(order_42(), &cancel, TIMEOUT).await;
        assert!(matches!(result, Err(LookupError::StorageUnavailable(_))));

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_with_live_owner_returns_the_winner() {
        let winner = ProcessId::new("X", "placement-activator/Order$order-42");
        let storage = Arc::new(CompetingWrite::new(ActivationRecord::new(
            order_42(),
            winner.clone(),
            "B",
        )));
        let owner = owner_of(&order_42(), &members());
        let mut transport = MockTransport::new();
        transport
            .expect_activate(&owner.address)
            .return_ok(ProcessId::new(&owner.address, "placement-activator/Order$order-42"));

        let (client, handle) = start(competing(&storage, 2, &transport));
        let cancel = CancellationToken::new();

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();

        assert_eq!(resolved, Some(winner.clone()));
        assert_eq!(
            storage.inner.records(),
            vec![ActivationRecord::new(order_42(), winner, "B")]
        );
        transport.verify();

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_with_departed_owner_gives_up_without_retries() {
        let stale = ProcessId::new("gone", "placement-activator/Order$order-42");
        let storage = Arc::new(CompetingWrite::new(ActivationRecord::new(
            order_42(),
            stale.clone(),
            "gone",
        )));
        let owner = owner_of(&order_42(), &members());
        let mut transport = MockTransport::new();
        transport
            .expect_activate(&owner.address)
            .return_ok(ProcessId::new(&owner.address, "placement-activator/Order$order-42"));

        let (client, handle) = start(competing(&storage, 0, &transport));
        let cancel = CancellationToken::new();

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();

        assert_eq!(resolved, None);
        assert_eq!(storage.inner.records().len(), 1);
        assert_eq!(storage.inner.records()[0].pid, stale);
        transport.verify();

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_with_departed_owner_is_resolved_again() {
        let storage = Arc::new(CompetingWrite::new(ActivationRecord::new(
            order_42(),
            ProcessId::new("gone", "placement-activator/Order$order-42"),
            "gone",
        )));
        let owner = owner_of(&order_42(), &members());
        let pid = ProcessId::new(&owner.address, "placement-activator/Order$order-42");
        let mut transport = MockTransport::new();
        transport.expect_activate(&owner.address).return_ok(pid.clone());
        transport.expect_activate(&owner.address).return_ok(pid.clone());

        let (client, handle) = start(competing(&storage, 1, &transport));
        let cancel = CancellationToken::new();

        let resolved = client.resolve(order_42(), &cancel, TIMEOUT).await.unwrap();

        assert_eq!(resolved, Some(pid.clone()));
        assert_eq!(
            storage.inner.records(),
            vec![ActivationRecord::new(order_42(), pid, owner.id)]
        );
        assert_eq!(transport.activate_calls(), 2);
        transport.verify();

        drop(client);
        handle.await.unwrap();
    }
}
