//! # Core Request/Reply Plumbing
//!
//! Every actor in this crate follows the same shape: a struct that owns the
//! receiving half of an `mpsc` channel and runs a sequential loop, plus a cheap,
//! cloneable client that holds the sending half. Requests carry a `oneshot`
//! sender for the reply.
//!
//! ## Key Types
//!
//! - [`FrameworkError`]: failures of the plumbing itself (closed mailbox,
//!   dropped reply, cancellation, timeout).
//! - [`Response`]: the reply channel embedded in request messages.
//! - [`ask`] / [`ask_with_timeout`]: send a request and await its reply while
//!   honouring a [`CancellationToken`].

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Errors that can occur while talking to an actor.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Type alias for the one-shot response channel embedded in request messages.
pub type Response<T> = oneshot::Sender<T>;

/// Sends a request built by `make` and waits for the reply.
///
/// Both the enqueue (which may wait on a full mailbox) and the reply are raced
/// against `cancel`. Once the token fires the reply receiver is dropped, so an
/// actor that answers late observes a closed channel and nothing else.
pub async fn ask<M, T, F>(
    sender: &mpsc::Sender<M>,
    make: F,
    cancel: &CancellationToken,
) -> Result<T, FrameworkError>
where
    F: FnOnce(Response<T>) -> M,
{
    if cancel.is_cancelled() {
        return Err(FrameworkError::Cancelled);
    }

    let (respond_to, response) = oneshot::channel();
    let message = make(respond_to);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FrameworkError::Cancelled),
        sent = sender.send(message) => sent.map_err(|_| FrameworkError::ActorClosed)?,
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FrameworkError::Cancelled),
        reply = response => reply.map_err(|_| FrameworkError::ActorDropped),
    }
}

/// Same as [`ask`], additionally bounded by `timeout`.
///
/// On timeout `cancel` is *not* fired; callers that want the receiving actor to
/// abandon its work should pass a child token and cancel it themselves.
pub async fn ask_with_timeout<M, T, F>(
    sender: &mpsc::Sender<M>,
    make: F,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<T, FrameworkError>
where
    F: FnOnce(Response<T>) -> M,
{
    match tokio::time::timeout(timeout, ask(sender, make, cancel)).await {
        Ok(result) => result,
        Err(_) => Err(FrameworkError::Timeout(timeout)),
    }
}
