use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniquely identifies a virtual actor within the cluster.
///
/// Independent of where (or whether) the actor is currently activated. The
/// `Display` form `"{kind}/{identity}"` is the routing key used by the
/// consistent-hash router and the rendezvous election.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterIdentity {
    identity: String,
    kind: String,
}

impl ClusterIdentity {
    pub fn new(kind: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            kind: kind.into(),
        }
    }

    /// The application-defined name, e.g. `"order-42"`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The registered kind, e.g. `"Order"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.identity)
    }
}
