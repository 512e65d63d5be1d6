#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Identity Lookup
//!
//! > **Where does this virtual actor live right now?**
//!
//! This crate resolves a cluster identity (a kind plus an application-defined
//! name) to the single process hosting it, activating one on demand, and keeps
//! that answer correct while members join and leave.
//!
//! ## 🏗️ How a resolve flows
//!
//! 1. [`IdentityStorageLookup::resolve`](lookup::IdentityLookup::resolve) hands the
//!    request to the [`ConsistentHashRouter`](routing::ConsistentHashRouter).
//! 2. The router hashes the identity to one [`IdentityWorker`](worker::IdentityWorker).
//!    The same identity always reaches the same worker, so requests for it are
//!    processed one after another without a lock.
//! 3. The worker reads [`IdentityStorage`](storage::IdentityStorage). A record
//!    whose owner is still a member is the answer.
//! 4. Otherwise the worker elects an owner with
//!    [`elect_owner`](routing::elect_owner) and asks that member's
//!    [`PlacementActor`](placement::PlacementActor) to activate the identity.
//! 5. Only after the placement reply arrives, and only if the caller has not
//!    given up, the new [`ActivationRecord`](domain::ActivationRecord) is stored.
//!
//! Departed members are cleaned up in the background: every `left` member of a
//! [`ClusterTopology`](domain::ClusterTopology) event gets its own cleanup task.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Actors and clients
//! The worker and the placement actor each own an `mpsc` mailbox and process
//! one message at a time. Callers talk to them through cloneable clients built on
//! [`framework::ask`].
//!
//! ### 2. Cancellation everywhere
//! Every externally facing operation takes a `CancellationToken`. A cancelled
//! or timed out resolve never leaves a record behind.
//!
//! ### 3. External collaborators
//! Membership, the wire transport and the process runtime live outside this crate
//! and are consumed through [`cluster::MemberList`], [`cluster::PlacementTransport`]
//! and [`cluster::ActivationSpawner`]. In-process versions of each are included.
//!
//! ### 4. Observability
//! Everything logs through `tracing`. Failures of background cleanup are also
//! published as [`LookupEvent`](lookup::LookupEvent)s.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod cluster;
pub mod domain;
pub mod framework;
pub mod lookup;
pub mod placement;
pub mod routing;
pub mod runtime;
pub mod storage;
pub mod worker;
