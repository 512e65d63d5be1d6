//! # Consistent-Hash Router
//!
//! Fronts a fixed pool of [`IdentityWorker`]s. The slot of an identity is
//! `stable_hash(identity) % pool_size`, so for a fixed pool size every request
//! for the same identity reaches the same worker and is processed in arrival
//! order behind the ones before it.

use super::hashing::stable_hash;
use crate::domain::ClusterIdentity;
use crate::worker::{IdentityWorker, WorkerClient, WorkerContext};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Worker slot for `identity` in a pool of `pool_size` workers.
pub fn slot_for(identity: &ClusterIdentity, pool_size: usize) -> usize {
    let key = identity.to_string();
    (stable_hash(&[key.as_bytes()]) % pool_size.max(1) as u64) as usize
}

pub struct ConsistentHashRouter {
    workers: Vec<WorkerClient>,
    handles: Vec<JoinHandle<()>>,
}

impl ConsistentHashRouter {
    /// Spawns `pool_size` workers sharing `context`.
    pub fn new(pool_size: usize, mailbox_capacity: usize, context: WorkerContext) -> Self {
        let pool_size = pool_size.max(1);
        let mut workers = Vec::with_capacity(pool_size);
        let mut handles = Vec::with_capacity(pool_size);

        for slot in 0..pool_size {
            let (worker, client) = IdentityWorker::new(mailbox_capacity, slot);
            handles.push(tokio::spawn(worker.run(context.clone())));
            workers.push(client);
        }

        info!(pool_size, mailbox_capacity, "Worker pool started");
        Self { workers, handles }
    }

    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    pub fn slot_for(&self, identity: &ClusterIdentity) -> usize {
        slot_for(identity, self.workers.len())
    }

    /// The worker responsible for `identity`.
    pub fn route(&self, identity: &ClusterIdentity) -> &WorkerClient {
        let slot = self.slot_for(identity);
        debug!(%identity, slot, "Routed");
        &self.workers[slot]
    }

    /// Closes every mailbox and waits for the workers to drain.
    pub async fn shutdown(self) {
        let Self { workers, handles } = self;
        drop(workers);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task failed");
            }
        }
        info!("Worker pool stopped");
    }
}
