//! # Mock Transport
//!
//! A [`PlacementTransport`] that answers activation requests from a queue of
//! expectations instead of real placement actors. Lets worker tests decide
//! what the owning member replies, and when.
//!
//! ```ignore
//! let mut transport = MockTransport::new();
//! transport.expect_activate("A").return_ok(pid);
//! transport
//!     .expect_activate("B")
//!     .delay(Duration::from_millis(200))
//!     .return_err(ActivationError::SpawnFailed("boom".into()));
//!
//! // Hand `Arc::new(transport.clone())` to the code under test...
//! transport.verify(); // Ensures all expectations were met
//! ```

use crate::cluster::PlacementTransport;
use crate::domain::{ClusterIdentity, ProcessId};
use crate::placement::{ActivationError, PlacementClient};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Expectation {
    address: String,
    delay: Option<Duration>,
    response: Result<ProcessId, ActivationError>,
}

#[derive(Default)]
struct Recorded {
    activations: Vec<(ProcessId, ClusterIdentity)>,
    deactivations: Vec<(ProcessId, ProcessId)>,
}

/// Scripted transport. Clones share the same expectations and recordings.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects an activation request to the placement actor at `address`.
    pub fn expect_activate(&mut self, address: &str) -> ActivateExpectationBuilder {
        ActivateExpectationBuilder {
            address: address.to_string(),
            delay: None,
            expectations: self.expectations.clone(),
        }
    }

    /// Number of activation requests received so far.
    pub fn activate_calls(&self) -> usize {
        self.recorded().activations.len()
    }

    /// Targets and identities of every activation request, in arrival order.
    pub fn activations(&self) -> Vec<(ProcessId, ClusterIdentity)> {
        self.recorded().activations.clone()
    }

    /// Targets and pids of every deactivation request, in arrival order.
    pub fn deactivations(&self) -> Vec<(ProcessId, ProcessId)> {
        self.recorded().deactivations.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlacementTransport for MockTransport {
    fn register(&self, _pid: ProcessId, _client: PlacementClient) {}

    fn unregister(&self, _pid: &ProcessId) {}

    async fn activate(
        &self,
        target: &ProcessId,
        identity: ClusterIdentity,
        cancel: &CancellationToken,
    ) -> Result<ProcessId, ActivationError> {
        self.recorded()
            .activations
            .push((target.clone(), identity.clone()));

        let expectation = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(expectation) = expectation else {
            panic!("Unexpected activation of {identity} at {target}");
        };
        if expectation.address != target.address {
            panic!(
                "Expected activation at {}, got {target} for {identity}",
                expectation.address
            );
        }

        if let Some(delay) = expectation.delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ActivationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        expectation.response
    }

    async fn deactivate(&self, target: &ProcessId, pid: ProcessId) -> Result<bool, ActivationError> {
        self.recorded().deactivations.push((target.clone(), pid));
        Ok(false)
    }
}

/// Builder for `activate` expectations.
pub struct ActivateExpectationBuilder {
    address: String,
    delay: Option<Duration>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ActivateExpectationBuilder {
    /// Holds the reply back for `delay`, or until the request is cancelled.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, pid: ProcessId) {
        self.push(Ok(pid));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ActivationError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<ProcessId, ActivationError>) {
        let mut exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        exps.push_back(Expectation {
            address: self.address,
            delay: self.delay,
            response,
        });
    }
}
