//! Deterministic routing: owner election across members and worker selection
//! inside one member.

pub mod hashing;
pub mod router;

pub use hashing::*;
pub use router::*;
