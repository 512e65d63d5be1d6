//! Stable hashing and owner election.
//!
//! Both functions must give the same answer on every member and across
//! restarts, so they hash with SHA-256 rather than the randomly seeded std
//! hasher.

use crate::domain::{ClusterIdentity, Member};
use sha2::{Digest, Sha256};

/// 64-bit hash of `parts`, stable across processes and platforms.
///
/// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Picks the owner for `identity` by rendezvous hashing over the members that
/// host its kind.
///
/// Every member scores `stable_hash(identity, member_id)`; the highest score
/// wins and ties go to the smaller member id. With a fixed membership view the
/// result is always the same member, and removing a member only moves the
/// identities that member owned.
pub fn elect_owner<'a>(identity: &ClusterIdentity, members: &'a [Member]) -> Option<&'a Member> {
    let key = identity.to_string();
    members
        .iter()
        .filter(|member| member.hosts(identity.kind()))
        .map(|member| {
            let score = stable_hash(&[key.as_bytes(), member.id.as_bytes()]);
            (score, member)
        })
        .max_by(|(a_score, a), (b_score, b)| a_score.cmp(b_score).then_with(|| b.id.cmp(&a.id)))
        .map(|(_, member)| member)
}
