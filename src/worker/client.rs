use super::actor::WorkerRequest;
use crate::domain::{ClusterIdentity, ProcessId};
use crate::framework::{ask_with_timeout, FrameworkError};
use crate::lookup::LookupError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Client for one identity worker. Cheap to clone.
#[derive(Clone)]
pub struct WorkerClient {
    sender: mpsc::Sender<WorkerRequest>,
}

impl WorkerClient {
    pub fn new(sender: mpsc::Sender<WorkerRequest>) -> Self {
        Self { sender }
    }

    /// Resolves `identity`, giving up after `timeout`.
    ///
    /// The worker receives a child of `cancel` that is fired when this call
    /// returns or is dropped, so a timed out or abandoned request stops
    /// its storage and placement work.
    #[instrument(skip(self, cancel), fields(identity = %identity))]
    pub async fn resolve(
        &self,
        identity: ClusterIdentity,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<Option<ProcessId>, LookupError> {
        debug!("Sending request");
        let child = cancel.child_token();
        let _guard = child.clone().drop_guard();

        match ask_with_timeout(
            &self.sender,
            |respond_to| WorkerRequest::Resolve {
                identity,
                cancel: child.clone(),
                respond_to,
            },
            &child,
            timeout,
        )
        .await
        {
            Ok(result) => result,
            Err(FrameworkError::Timeout(after)) => Err(LookupError::Timeout(after)),
            Err(FrameworkError::Cancelled) => Err(LookupError::Cancelled),
            Err(FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                Err(LookupError::Shutdown)
            }
        }
    }
}
