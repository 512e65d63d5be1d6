use super::actor::PlacementRequest;
use super::error::ActivationError;
use crate::domain::{ClusterIdentity, ProcessId};
use crate::framework::ask;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Client for the placement actor of one member. Cheap to clone.
#[derive(Clone)]
pub struct PlacementClient {
    sender: mpsc::Sender<PlacementRequest>,
}

impl PlacementClient {
    pub fn new(sender: mpsc::Sender<PlacementRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self, cancel), fields(identity = %identity))]
    pub async fn activate(
        &self,
        identity: ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<ProcessId, ActivationError> {
        debug!("Sending request");
        ask(
            &self.sender,
            |respond_to| PlacementRequest::Activate {
                identity,
                respond_to,
            },
            cancel,
        )
        .await?
    }

    /// Stops the activation `pid` if this member hosts it.
    #[instrument(skip(self), fields(pid = %pid))]
    pub async fn deactivate(&self, pid: ProcessId) -> Result<bool, ActivationError> {
        debug!("Sending request");
        let cancel = CancellationToken::new();
        Ok(ask(
            &self.sender,
            |respond_to| PlacementRequest::Deactivate { pid, respond_to },
            &cancel,
        )
        .await?)
    }

    /// Stops every hosted activation and terminates the actor. Returns how
    /// many activations were stopped.
    pub async fn stop(&self) -> Result<usize, ActivationError> {
        let cancel = CancellationToken::new();
        Ok(ask(
            &self.sender,
            |respond_to| PlacementRequest::Stop { respond_to },
            &cancel,
        )
        .await?)
    }
}
