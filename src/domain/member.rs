use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node participating in the cluster for one membership session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub address: String,
    /// Kinds this member is able to activate. Clients register none.
    pub kinds: Vec<String>,
}

impl Member {
    pub fn new(id: impl Into<String>, address: impl Into<String>, kinds: &[&str]) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn hosts(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

/// Membership change notification.
///
/// `members` is the complete view after the change; `joined` and `left` are
/// the member ids that differ from the previous view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    pub members: Vec<Member>,
    pub joined: BTreeSet<String>,
    pub left: BTreeSet<String>,
}

impl ClusterTopology {
    pub fn is_empty_change(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}
