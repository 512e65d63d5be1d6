#![allow(dead_code)]

use async_trait::async_trait;
use identity_lookup::cluster::{
    ActivationSpawner, ClusterContext, LocalTransport, MemberList, SpawnError, TaskSpawner,
};
use identity_lookup::domain::{ClusterIdentity, Member, ProcessId};
use identity_lookup::lookup::{IdentityLookup, IdentityStorageLookup};
use identity_lookup::runtime::LookupConfig;
use identity_lookup::storage::InMemoryIdentityStorage;
use std::sync::Arc;
use std::time::Duration;

pub const KINDS: [&str; 2] = ["Order", "Invoice"];

/// Spawner that takes `delay` before every spawn.
pub struct SlowSpawner {
    pub inner: TaskSpawner,
    pub delay: Duration,
}

impl SlowSpawner {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: TaskSpawner::new(),
            delay,
        }
    }
}

#[async_trait]
impl ActivationSpawner for SlowSpawner {
    async fn spawn(&self, identity: &ClusterIdentity, pid: &ProcessId) -> Result<(), SpawnError> {
        tokio::time::sleep(self.delay).await;
        self.inner.spawn(identity, pid).await
    }

    async fn stop(&self, pid: &ProcessId) {
        self.inner.stop(pid).await
    }
}

pub struct TestNode {
    pub member: Member,
    pub lookup: IdentityStorageLookup,
    pub spawner: Arc<TaskSpawner>,
}

/// Several members in one process sharing storage, transport and membership.
pub struct TestCluster {
    pub storage: Arc<InMemoryIdentityStorage>,
    pub transport: LocalTransport,
    pub member_list: MemberList,
    pub nodes: Vec<TestNode>,
}

impl TestCluster {
    /// Starts one member per id. Addresses equal ids.
    pub async fn start(ids: &[&str], config: LookupConfig) -> Self {
        let storage = Arc::new(InMemoryIdentityStorage::new());
        let transport = LocalTransport::new();
        let members: Vec<Member> = ids.iter().map(|id| Member::new(*id, *id, &KINDS)).collect();
        let member_list = MemberList::new(members.clone());

        let mut nodes = Vec::new();
        for member in members {
            let spawner = Arc::new(TaskSpawner::new());
            let lookup = IdentityStorageLookup::new(storage.clone(), config.clone());
            let cluster = ClusterContext::new(
                member.id.clone(),
                member.address.clone(),
                member_list.clone(),
                Arc::new(transport.clone()),
                spawner.clone(),
            );
            lookup
                .setup(cluster, KINDS.iter().map(|k| k.to_string()).collect(), false)
                .await
                .expect("setup failed");
            nodes.push(TestNode {
                member,
                lookup,
                spawner,
            });
        }

        Self {
            storage,
            transport,
            member_list,
            nodes,
        }
    }

    pub fn node(&self, id: &str) -> &TestNode {
        self.nodes
            .iter()
            .find(|node| node.member.id == id)
            .expect("no such node")
    }

    pub fn total_spawns(&self) -> u64 {
        self.nodes.iter().map(|node| node.spawner.spawn_count()).sum()
    }

    /// Drops `id` from the membership view without shutting it down.
    pub fn remove_member(&self, id: &str) {
        let survivors: Vec<Member> = self
            .member_list
            .members()
            .iter()
            .filter(|m| m.id != id)
            .cloned()
            .collect();
        self.member_list.update_members(survivors);
    }

    pub async fn shutdown(&self) {
        for node in &self.nodes {
            node.lookup.shutdown().await.expect("shutdown failed");
        }
    }
}

pub fn config() -> LookupConfig {
    LookupConfig::default()
        .with_worker_pool_size(8)
        .with_request_timeout(Duration::from_secs(2))
}
