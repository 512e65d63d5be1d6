//! # Event Probe
//!
//! Test helper for asserting on event sequences. A probe subscribes when it is
//! created, so every event published afterwards is buffered until an
//! expectation consumes it. Events that do not match the current expectation
//! are discarded.
//!
//! ```ignore
//! let mut probe = EventProbe::new(lookup.events());
//! cluster.member_list.update_members(remaining);
//! probe
//!     .expect(Duration::from_secs(1), |e| matches!(e, LookupEvent::MemberCleaned { .. }))
//!     .await?;
//! ```

use super::event_stream::EventStream;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("No matching event within {0:?}")]
    Timeout(Duration),
    #[error("Event stream closed")]
    Closed,
}

pub struct EventProbe<T: Clone + Send + 'static> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> EventProbe<T> {
    pub fn new(stream: &EventStream<T>) -> Self {
        Self {
            receiver: stream.subscribe(),
        }
    }

    /// Waits for the first event matching `predicate`.
    pub async fn expect<F>(&mut self, timeout: Duration, predicate: F) -> Result<T, ProbeError>
    where
        F: Fn(&T) -> bool,
    {
        let wait = async {
            loop {
                match self.receiver.recv().await {
                    Ok(event) if predicate(&event) => return Ok(event),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return Err(ProbeError::Closed),
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(Err(ProbeError::Timeout(timeout)))
    }
}
