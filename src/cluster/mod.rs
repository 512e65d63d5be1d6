//! Collaborators the identity lookup consumes from the surrounding cluster
//! runtime: the membership view, the placement transport and the spawn
//! primitive. [`ClusterContext`] bundles them for one member.

pub mod member_list;
pub mod spawner;
pub mod transport;

pub use member_list::*;
pub use spawner::*;
pub use transport::*;

use std::sync::Arc;

/// Handle to the cluster as seen by one member.
#[derive(Clone)]
pub struct ClusterContext {
    /// Stable id of this member for its membership session.
    pub member_id: String,
    /// Address other members use to reach this member.
    pub address: String,
    pub member_list: MemberList,
    pub transport: Arc<dyn PlacementTransport>,
    pub spawner: Arc<dyn ActivationSpawner>,
}

impl ClusterContext {
    pub fn new(
        member_id: impl Into<String>,
        address: impl Into<String>,
        member_list: MemberList,
        transport: Arc<dyn PlacementTransport>,
        spawner: Arc<dyn ActivationSpawner>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            address: address.into(),
            member_list,
            transport,
            spawner,
        }
    }
}
