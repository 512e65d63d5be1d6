//! # Identity Lookup Demo
//!
//! Runs a three-member cluster inside one process, resolves a few identities,
//! drops a member from the membership view and shows the affected identity
//! being placed again on a surviving member.

use identity_lookup::cluster::{ClusterContext, LocalTransport, MemberList, TaskSpawner};
use identity_lookup::domain::{ClusterIdentity, Member};
use identity_lookup::lookup::{IdentityLookup, IdentityStorageLookup, LookupError};
use identity_lookup::routing::elect_owner;
use identity_lookup::runtime::{setup_tracing, LookupConfig};
use identity_lookup::storage::InMemoryIdentityStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

const KINDS: [&str; 2] = ["Order", "Invoice"];

struct Node {
    id: String,
    lookup: IdentityStorageLookup,
}

#[tokio::main]
async fn main() -> Result<(), LookupError> {
    setup_tracing();

    let storage = Arc::new(InMemoryIdentityStorage::new());
    let transport = LocalTransport::new();
    let members: Vec<Member> = ["A", "B", "C"]
        .into_iter()
        .map(|id| Member::new(id, format!("{id}:4020"), &KINDS))
        .collect();
    let member_list = MemberList::new(members.clone());
    let config = LookupConfig::default()
        .with_worker_pool_size(8)
        .with_request_timeout(Duration::from_secs(2));

    let mut nodes = Vec::new();
    for member in &members {
        let lookup = IdentityStorageLookup::new(storage.clone(), config.clone());
        let cluster = ClusterContext::new(
            member.id.clone(),
            member.address.clone(),
            member_list.clone(),
            Arc::new(transport.clone()),
            Arc::new(TaskSpawner::new()),
        );
        lookup
            .setup(cluster, KINDS.iter().map(|k| k.to_string()).collect(), false)
            .await?;
        nodes.push(Node {
            id: member.id.clone(),
            lookup,
        });
    }

    let cancel = CancellationToken::new();
    let identities: Vec<ClusterIdentity> = (1..=5)
        .map(|n| ClusterIdentity::new("Order", format!("order-{n}")))
        .chain([ClusterIdentity::new("Invoice", "invoice-7")])
        .collect();

    let span = tracing::info_span!("first_pass");
    async {
        for (n, identity) in identities.iter().enumerate() {
            // Ask a different member each time; the answer must not depend on it.
            let node = &nodes[n % nodes.len()];
            match node.lookup.resolve(identity, &cancel).await? {
                Some(pid) => info!(asked = %node.id, %identity, %pid, "Resolved"),
                None => warn!(asked = %node.id, %identity, "No activation"),
            }
        }
        Ok::<_, LookupError>(())
    }
    .instrument(span)
    .await?;

    let order_42 = ClusterIdentity::new("Order", "order-42");
    let first = nodes[0].lookup.resolve(&order_42, &cancel).await?;
    let again = nodes[1].lookup.resolve(&order_42, &cancel).await?;
    info!(identity = %order_42, first = ?first, again = ?again, "Resolved twice");

    // The owner of order-42 drops out of the membership view without shutting
    // down, the way a crashed member would.
    let Some(owner) = elect_owner(&order_42, &members).map(|m| m.id.clone()) else {
        return Ok(());
    };
    let survivors: Vec<Member> = members.iter().filter(|m| m.id != owner).cloned().collect();
    info!(member_id = %owner, "Removing member from the cluster");
    member_list.update_members(survivors);

    // Cleanup runs in the background; give it a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!(records = storage.len(), "Records after cleanup");

    let Some(asked) = nodes.iter().find(|node| node.id != owner) else {
        return Ok(());
    };
    let replaced = asked.lookup.resolve(&order_42, &cancel).await?;
    info!(identity = %order_42, before = ?first, after = ?replaced, "Placed again");

    for node in &nodes {
        node.lookup.shutdown().await?;
    }
    info!(records = storage.len(), "Cluster shut down");
    Ok(())
}
