//! Per-member activation authority.

pub mod actor;
pub mod client;
pub mod error;
pub mod naming;

pub use actor::*;
pub use client::*;
pub use error::*;
pub use naming::*;
