use super::{ClusterIdentity, ProcessId};
use serde::{Deserialize, Serialize};

/// A live activation as persisted in identity storage.
///
/// Created by an identity worker after a successful placement, replaced on
/// reactivation after owner failure, removed on member departure or explicit
/// deactivation. `member_id` is the node that hosts `pid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub cluster_identity: ClusterIdentity,
    pub pid: ProcessId,
    pub member_id: String,
}

impl ActivationRecord {
    pub fn new(cluster_identity: ClusterIdentity, pid: ProcessId, member_id: impl Into<String>) -> Self {
        Self {
            cluster_identity,
            pid,
            member_id: member_id.into(),
        }
    }
}
