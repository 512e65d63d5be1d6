//! Value types shared by every layer: identities, process ids, activation
//! records and membership.

pub mod activation;
pub mod cluster_identity;
pub mod member;
pub mod process_id;

pub use activation::*;
pub use cluster_identity::*;
pub use member::*;
pub use process_id::*;
