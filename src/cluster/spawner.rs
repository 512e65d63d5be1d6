//! The actor runtime's spawn primitive, as seen by the placement actor.

use crate::domain::{ClusterIdentity, ProcessId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("Spawn failed for {identity}: {reason}")]
    Failed { identity: String, reason: String },
}

/// Starts and stops the processes backing activations.
#[async_trait]
pub trait ActivationSpawner: Send + Sync {
    /// Starts the process for `identity` under the local id in `pid`.
    async fn spawn(&self, identity: &ClusterIdentity, pid: &ProcessId) -> Result<(), SpawnError>;

    /// Stops a process previously started by [`ActivationSpawner::spawn`].
    async fn stop(&self, pid: &ProcessId);
}

/// Spawner that backs every activation with a tokio task parked on a
/// cancellation token. Used by the demo and the tests.
#[derive(Default)]
pub struct TaskSpawner {
    live: Mutex<HashMap<ProcessId, CancellationToken>>,
    failing_kinds: Mutex<HashSet<String>>,
    spawned: AtomicU64,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future spawn of `kind` fail.
    pub fn fail_kind(&self, kind: &str) {
        self.failing_kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.to_string());
    }

    pub fn spawn_count(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn is_live(&self, pid: &ProcessId) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(pid)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ActivationSpawner for TaskSpawner {
    async fn spawn(&self, identity: &ClusterIdentity, pid: &ProcessId) -> Result<(), SpawnError> {
        let failing = self
            .failing_kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(identity.kind());
        if failing {
            return Err(SpawnError::Failed {
                identity: identity.to_string(),
                reason: "kind is configured to fail".into(),
            });
        }

        let token = CancellationToken::new();
        let process = token.clone();
        let name = pid.to_string();
        tokio::spawn(async move {
            process.cancelled().await;
            debug!(pid = %name, "Process stopped");
        });

        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid.clone(), token);
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, pid: &ProcessId) {
        let token = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pid);
        if let Some(token) = token {
            token.cancel();
        }
    }
}
