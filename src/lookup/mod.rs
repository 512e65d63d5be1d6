//! # Identity Lookup
//!
//! The public entry point. [`IdentityStorageLookup`] wires identity storage,
//! the worker pool and the membership subscription together and exposes the
//! lifecycle operations of [`IdentityLookup`].
//!
//! ## Lifecycle
//!
//! `setup` initializes storage first, then starts the worker pool and the
//! topology watcher and, on members only, the placement actor. `shutdown`
//! tears this down in the opposite order, stopping the placement actor before
//! removing the records this member owns.
//!
//! Departed members are cleaned up by one detached task per member, so the
//! topology watcher never waits on storage. Results of that background work
//! are published on [`IdentityStorageLookup::events`].

pub mod error;
pub mod events;

pub use error::*;
pub use events::*;

use crate::cluster::ClusterContext;
use crate::domain::{ClusterIdentity, ClusterTopology, ProcessId};
use crate::framework::EventStream;
use crate::placement::{
    is_valid_kind, remote_placement_actor, try_extract_cluster_identity, PlacementActor,
    PlacementClient,
};
use crate::routing::ConsistentHashRouter;
use crate::runtime::LookupConfig;
use crate::storage::IdentityStorage;
use crate::worker::WorkerContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Resolution of cluster identities to the processes hosting them.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Starts the lookup for this member. `kinds` are the kinds this member
    /// hosts; client members (`is_client`) host nothing and only resolve.
    async fn setup(
        &self,
        cluster: ClusterContext,
        kinds: Vec<String>,
        is_client: bool,
    ) -> Result<(), LookupError>;

    /// Returns the process hosting `identity`, activating it if needed.
    ///
    /// `Ok(None)` means no activation could be established. Running out of
    /// time or being cancelled is reported as an error instead.
    async fn resolve(
        &self,
        identity: &ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<ProcessId>, LookupError>;

    /// Forgets the activation `pid` and asks its member to stop it.
    async fn remove_process(
        &self,
        pid: &ProcessId,
        cancel: &CancellationToken,
    ) -> Result<(), LookupError>;

    /// Stops this member's part of the lookup. Cleanup failures are logged
    /// and published but never returned.
    async fn shutdown(&self) -> Result<(), LookupError>;
}

struct Placement {
    pid: ProcessId,
    client: PlacementClient,
    handle: JoinHandle<()>,
}

struct Running {
    cluster: ClusterContext,
    router: ConsistentHashRouter,
    watcher_stop: CancellationToken,
    watcher: JoinHandle<()>,
    placement: Option<Placement>,
}

enum LookupState {
    Idle,
    Running(Box<Running>),
    Stopped,
}

/// [`IdentityLookup`] backed by an [`IdentityStorage`].
pub struct IdentityStorageLookup {
    storage: Arc<dyn IdentityStorage>,
    config: LookupConfig,
    events: EventStream<LookupEvent>,
    state: RwLock<LookupState>,
}

impl IdentityStorageLookup {
    pub fn new(storage: Arc<dyn IdentityStorage>, config: LookupConfig) -> Self {
        Self {
            storage,
            config,
            events: EventStream::default(),
            state: RwLock::new(LookupState::Idle),
        }
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Outcomes of member cleanup, including failures.
    pub fn events(&self) -> &EventStream<LookupEvent> {
        &self.events
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.read().await, LookupState::Running(_))
    }

    fn start_placement(&self, cluster: &ClusterContext, kinds: Vec<String>) -> Placement {
        let (actor, client) = PlacementActor::new(
            self.config.mailbox_capacity(),
            cluster.address.clone(),
            kinds,
            cluster.spawner.clone(),
        );
        let handle = tokio::spawn(actor.run());
        let pid = remote_placement_actor(&cluster.address);
        cluster.transport.register(pid.clone(), client.clone());
        Placement {
            pid,
            client,
            handle,
        }
    }

    async fn stop_placement(cluster: &ClusterContext, placement: Placement) {
        let Placement {
            pid,
            client,
            handle,
        } = placement;

        cluster.transport.unregister(&pid);
        match client.stop().await {
            Ok(stopped) => info!(member_id = %cluster.member_id, stopped, "Placement actor stopped"),
            Err(e) => error!(member_id = %cluster.member_id, error = %e, "Failed to stop placement actor"),
        }
        if let Err(e) = handle.await {
            error!(member_id = %cluster.member_id, error = %e, "Placement actor task failed");
        }
    }
}

#[async_trait]
impl IdentityLookup for IdentityStorageLookup {
    #[instrument(skip(self, cluster, kinds), fields(member_id = %cluster.member_id))]
    async fn setup(
        &self,
        cluster: ClusterContext,
        kinds: Vec<String>,
        is_client: bool,
    ) -> Result<(), LookupError> {
        let mut state = self.state.write().await;
        if matches!(*state, LookupState::Running(_)) {
            info!("Already set up, ignoring");
            return Ok(());
        }

        if let Some(kind) = kinds.iter().find(|kind| !is_valid_kind(kind)) {
            return Err(LookupError::InvalidKind(kind.clone()));
        }

        self.storage
            .init(&CancellationToken::new())
            .await
            .map_err(LookupError::Initialization)?;

        let router = ConsistentHashRouter::new(
            self.config.worker_pool_size(),
            self.config.mailbox_capacity(),
            WorkerContext {
                storage: self.storage.clone(),
                member_list: cluster.member_list.clone(),
                transport: cluster.transport.clone(),
                max_conflict_retries: self.config.max_conflict_retries,
            },
        );

        let watcher_stop = CancellationToken::new();
        let watcher = tokio::spawn(watch_topology(
            cluster.member_list.subscribe_topology(),
            self.storage.clone(),
            self.events.clone(),
            self.config.request_timeout(),
            watcher_stop.clone(),
        ));

        let placement = (!is_client).then(|| self.start_placement(&cluster, kinds.clone()));

        info!(
            address = %cluster.address,
            is_client,
            kinds = ?kinds,
            pool_size = router.pool_size(),
            "Identity lookup set up"
        );

        *state = LookupState::Running(Box::new(Running {
            cluster,
            router,
            watcher_stop,
            watcher,
            placement,
        }));
        Ok(())
    }

    #[instrument(skip(self, cancel), fields(identity = %identity))]
    async fn resolve(
        &self,
        identity: &ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<ProcessId>, LookupError> {
        let worker = match &*self.state.read().await {
            LookupState::Running(running) => running.router.route(identity).clone(),
            LookupState::Idle => return Err(LookupError::NotSetUp),
            LookupState::Stopped => return Err(LookupError::Shutdown),
        };

        worker
            .resolve(identity.clone(), cancel, self.config.request_timeout())
            .await
    }

    #[instrument(skip(self, cancel), fields(pid = %pid))]
    async fn remove_process(
        &self,
        pid: &ProcessId,
        cancel: &CancellationToken,
    ) -> Result<(), LookupError> {
        let transport = match &*self.state.read().await {
            LookupState::Running(running) => running.cluster.transport.clone(),
            LookupState::Idle => return Err(LookupError::NotSetUp),
            LookupState::Stopped => return Err(LookupError::Shutdown),
        };

        self.storage.remove_activation(pid, cancel).await?;
        debug!("Activation record removed");

        // Only placement-spawned processes are known to a placement actor.
        if try_extract_cluster_identity(&pid.id).is_none() {
            return Ok(());
        }

        let target = remote_placement_actor(&pid.address);
        let deactivate = tokio::time::timeout(
            self.config.request_timeout(),
            transport.deactivate(&target, pid.clone()),
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => debug!("Deactivation abandoned"),
            outcome = deactivate => match outcome {
                Ok(Ok(found)) => debug!(found, "Deactivated"),
                Ok(Err(e)) => warn!(error = %e, "Deactivation failed"),
                Err(_) => warn!("Deactivation timed out"),
            },
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), LookupError> {
        let running = {
            let mut state = self.state.write().await;
            match std::mem::replace(&mut *state, LookupState::Stopped) {
                LookupState::Running(running) => *running,
                LookupState::Stopped => return Ok(()),
                LookupState::Idle => {
                    *state = LookupState::Idle;
                    return Err(LookupError::NotSetUp);
                }
            }
        };

        let Running {
            cluster,
            router,
            watcher_stop,
            watcher,
            placement,
        } = running;
        let member_id = cluster.member_id.clone();
        info!(%member_id, "Shutting down identity lookup");

        // No new local activations from here on.
        if let Some(placement) = placement {
            Self::stop_placement(&cluster, placement).await;
        }

        cleanup_member(
            self.storage.as_ref(),
            &self.events,
            &member_id,
            "shutdown",
            self.config.request_timeout(),
        )
        .await;

        watcher_stop.cancel();
        if let Err(e) = watcher.await {
            error!(%member_id, error = %e, "Topology watcher task failed");
        }
        router.shutdown().await;

        info!(%member_id, "Identity lookup shut down");
        Ok(())
    }
}

/// Spawns a cleanup task for every member that leaves, until `stop` fires.
async fn watch_topology(
    mut topology: broadcast::Receiver<ClusterTopology>,
    storage: Arc<dyn IdentityStorage>,
    events: EventStream<LookupEvent>,
    deadline: Duration,
    stop: CancellationToken,
) {
    debug!("Topology watcher started");
    loop {
        let change = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            change = topology.recv() => change,
        };

        match change {
            Ok(change) => {
                for member_id in change.left {
                    let storage = storage.clone();
                    let events = events.clone();
                    tokio::spawn(async move {
                        cleanup_member(
                            storage.as_ref(),
                            &events,
                            &member_id,
                            "member_left",
                            deadline,
                        )
                        .await;
                    });
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Records of members we missed are dropped lazily by resolve.
                warn!(skipped, "Topology watcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Topology watcher stopped");
}

/// Removes every record owned by `member_id` within `deadline`, reporting the
/// outcome as a [`LookupEvent`].
async fn cleanup_member(
    storage: &dyn IdentityStorage,
    events: &EventStream<LookupEvent>,
    member_id: &str,
    operation: &'static str,
    deadline: Duration,
) {
    let cancel = CancellationToken::new();
    // Fires on timeout so the backend can abandon the removal.
    let _abandon = cancel.clone().drop_guard();

    let error = match tokio::time::timeout(deadline, storage.remove_member(member_id, &cancel)).await {
        Ok(Ok(removed)) => {
            info!(member_id, operation, removed, "Removed member activations");
            events.publish(LookupEvent::MemberCleaned {
                member_id: member_id.to_string(),
                removed,
            });
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("Timed out after {deadline:?}"),
    };

    error!(member_id, operation, error = %error, "Failed to remove member activations");
    events.publish(LookupEvent::CleanupFailed {
        member_id: member_id.to_string(),
        operation,
        error,
    });
}
