//! Remote messaging between placement actors.
//!
//! The wire transport itself lives outside this crate. [`PlacementTransport`]
//! is the narrow contract the lookup needs: name registration plus
//! request/reply to a placement actor addressed by [`ProcessId`].
//! [`LocalTransport`] implements it in-process, which is enough to run several
//! members inside one test or demo.

use crate::domain::{ClusterIdentity, ProcessId};
use crate::placement::{ActivationError, PlacementClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
pub trait PlacementTransport: Send + Sync {
    /// Makes a local placement actor reachable under `pid`.
    fn register(&self, pid: ProcessId, client: PlacementClient);

    fn unregister(&self, pid: &ProcessId);

    /// Asks the placement actor at `target` to activate `identity`.
    async fn activate(
        &self,
        target: &ProcessId,
        identity: ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<ProcessId, ActivationError>;

    /// Asks the placement actor at `target` to stop the activation `pid`.
    /// Returns whether it was hosted there.
    async fn deactivate(&self, target: &ProcessId, pid: ProcessId) -> Result<bool, ActivationError>;
}

/// In-process transport: a shared registry of placement clients.
#[derive(Clone, Default)]
pub struct LocalTransport {
    registry: Arc<RwLock<HashMap<ProcessId, PlacementClient>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, pid: &ProcessId) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(pid)
    }

    fn lookup(&self, target: &ProcessId) -> Result<PlacementClient, ActivationError> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
            .ok_or_else(|| ActivationError::Unreachable(target.to_string()))
    }
}

#[async_trait]
impl PlacementTransport for LocalTransport {
    fn register(&self, pid: ProcessId, client: PlacementClient) {
        debug!(%pid, "Registered placement actor");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid, client);
    }

    fn unregister(&self, pid: &ProcessId) {
        debug!(%pid, "Unregistered placement actor");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pid);
    }

    async fn activate(
        &self,
        target: &ProcessId,
        identity: ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<ProcessId, ActivationError> {
        let client = self.lookup(target)?;
        client.activate(identity, cancel).await
    }

    async fn deactivate(&self, target: &ProcessId, pid: ProcessId) -> Result<bool, ActivationError> {
        let client = self.lookup(target)?;
        client.deactivate(pid).await
    }
}
