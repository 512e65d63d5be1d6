//! Building blocks shared by every actor in the crate.
//!
//! # Main Components
//!
//! - [`ask`] / [`ask_with_timeout`] - cancellable request/reply over `mpsc` + `oneshot`
//! - [`FrameworkError`] - failures of that plumbing
//! - [`EventStream`] - broadcast pub/sub for topology and lookup events
//! - [`EventProbe`] - waits for a matching event in tests
//!
//! # Testing
//!
//! See [`mock`] for a scripted [`PlacementTransport`](crate::cluster::PlacementTransport).

pub mod core;
pub mod event_stream;
pub mod mock;
pub mod probe;

pub use core::*;
pub use event_stream::*;
pub use probe::*;
