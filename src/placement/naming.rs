//! Addressing scheme for placement actors and the processes they spawn.
//!
//! Every member registers its placement actor under the same well-known name,
//! so the placement actor of any member can be addressed from its address
//! alone. Spawned processes get `"placement-activator/{kind}${identity}"` as
//! their local id: the identity is the suffix after the reserved `'$'`
//! delimiter and can be read back without a storage round trip.
//!
//! The kind sits between the actor name and the delimiter, unlike the bare
//! `"placement-activator${identity}"` form, so one name hosted under two kinds
//! on the same member gets two distinct ids.

use crate::domain::{ClusterIdentity, ProcessId};

pub const PLACEMENT_ACTOR_NAME: &str = "placement-activator";

/// Separates the identity suffix in the local id of a spawned process.
pub const IDENTITY_DELIMITER: char = '$';

/// Process id of the placement actor on the member at `address`.
pub fn remote_placement_actor(address: &str) -> ProcessId {
    ProcessId::new(address, PLACEMENT_ACTOR_NAME)
}

/// Process id given to the activation of `identity` on the member at `address`.
pub fn activation_process_id(address: &str, identity: &ClusterIdentity) -> ProcessId {
    ProcessId::new(
        address,
        format!(
            "{PLACEMENT_ACTOR_NAME}/{}{IDENTITY_DELIMITER}{}",
            identity.kind(),
            identity.identity()
        ),
    )
}

/// Recovers the identity from the local id of a placement-spawned process.
///
/// Returns `None` for ids that were not produced by a placement actor. Kinds
/// cannot contain the delimiter, so the first `'$'` after the prefix always
/// starts the identity, which may itself contain `'$'`.
pub fn try_extract_cluster_identity(pid_id: &str) -> Option<&str> {
    let rest = pid_id
        .strip_prefix(PLACEMENT_ACTOR_NAME)?
        .strip_prefix('/')?;
    let (kind, identity) = rest.split_once(IDENTITY_DELIMITER)?;
    if kind.is_empty() {
        return None;
    }
    Some(identity)
}

/// Whether `kind` can be embedded in placement process ids.
pub fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty() && !kind.contains(IDENTITY_DELIMITER) && !kind.contains('/')
}
