//! Pooled actors that resolve identities to process ids.

pub mod actor;
pub mod client;

pub use actor::*;
pub use client::*;
