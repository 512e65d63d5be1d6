//! # Placement Actor
//!
//! One per member. It is the only authority that starts activations on its
//! node, and it tracks which identities it hosts so repeated requests are
//! answered with the existing process instead of a second spawn.
//!
//! ## State per identity
//!
//! - absent (idle) → `Activating` while the spawn is awaited
//! - `Activating` → `Active(pid)` on success, back to absent on failure
//! - `Active(pid)` → absent on `Deactivate` or `Stop`
//!
//! The actor never retries a failed spawn; the failure goes back to the
//! caller, which decides whether to resolve again.

use super::client::PlacementClient;
use super::error::ActivationError;
use super::naming::activation_process_id;
use crate::cluster::ActivationSpawner;
use crate::domain::{ClusterIdentity, ProcessId};
use crate::framework::Response;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages understood by the placement actor.
#[derive(Debug)]
pub enum PlacementRequest {
    Activate {
        identity: ClusterIdentity,
        respond_to: Response<Result<ProcessId, ActivationError>>,
    },
    Deactivate {
        pid: ProcessId,
        respond_to: Response<bool>,
    },
    Stop {
        respond_to: Response<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActivationState {
    Activating,
    Active(ProcessId),
}

pub struct PlacementActor {
    receiver: mpsc::Receiver<PlacementRequest>,
    address: String,
    kinds: HashSet<String>,
    spawner: Arc<dyn ActivationSpawner>,
    activations: HashMap<ClusterIdentity, ActivationState>,
}

impl PlacementActor {
    /// Creates the actor and its client. The actor does nothing until
    /// [`PlacementActor::run`] is spawned.
    pub fn new(
        buffer_size: usize,
        address: impl Into<String>,
        kinds: Vec<String>,
        spawner: Arc<dyn ActivationSpawner>,
    ) -> (Self, PlacementClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            address: address.into(),
            kinds: kinds.into_iter().collect(),
            spawner,
            activations: HashMap::new(),
        };
        (actor, PlacementClient::new(sender))
    }

    pub async fn run(mut self) {
        let address = self.address.clone();
        info!(%address, kinds = self.kinds.len(), "Placement actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                PlacementRequest::Activate {
                    identity,
                    respond_to,
                } => {
                    let result = self.activate(identity).await;
                    let _ = respond_to.send(result);
                }
                PlacementRequest::Deactivate { pid, respond_to } => {
                    let found = self.deactivate(&pid).await;
                    let _ = respond_to.send(found);
                }
                PlacementRequest::Stop { respond_to } => {
                    let stopped = self.stop_all().await;
                    let _ = respond_to.send(stopped);
                    break;
                }
            }
        }

        info!(%address, size = self.activations.len(), "Placement actor stopped");
    }

    async fn activate(&mut self, identity: ClusterIdentity) -> Result<ProcessId, ActivationError> {
        if let Some(ActivationState::Active(pid)) = self.activations.get(&identity) {
            debug!(%identity, %pid, "Already active");
            return Ok(pid.clone());
        }

        if !self.kinds.contains(identity.kind()) {
            warn!(%identity, "Kind not hosted");
            return Err(ActivationError::UnknownKind(identity.kind().to_string()));
        }

        let pid = activation_process_id(&self.address, &identity);
        self.activations
            .insert(identity.clone(), ActivationState::Activating);

        match self.spawner.spawn(&identity, &pid).await {
            Ok(()) => {
                self.activations
                    .insert(identity.clone(), ActivationState::Active(pid.clone()));
                info!(%identity, %pid, size = self.activations.len(), "Activated");
                Ok(pid)
            }
            Err(e) => {
                self.activations.remove(&identity);
                warn!(%identity, error = %e, "Spawn failed");
                Err(ActivationError::SpawnFailed(e.to_string()))
            }
        }
    }

    async fn deactivate(&mut self, pid: &ProcessId) -> bool {
        let identity = self
            .activations
            .iter()
            .find(|(_, state)| matches!(state, ActivationState::Active(active) if active == pid))
            .map(|(identity, _)| identity.clone());

        match identity {
            Some(identity) => {
                self.spawner.stop(pid).await;
                self.activations.remove(&identity);
                info!(%identity, %pid, size = self.activations.len(), "Deactivated");
                true
            }
            None => {
                debug!(%pid, "Deactivate for unknown process");
                false
            }
        }
    }

    async fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for (identity, state) in self.activations.drain() {
            if let ActivationState::Active(pid) = state {
                self.spawner.stop(&pid).await;
                debug!(%identity, %pid, "Stopped on shutdown");
                stopped += 1;
            }
        }
        stopped
    }
}
