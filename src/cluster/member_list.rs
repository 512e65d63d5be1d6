//! Membership view consumed by the identity lookup.
//!
//! Detecting membership is the job of the gossip layer; this type only holds
//! the latest view and turns every change into a [`ClusterTopology`] event.

use crate::domain::{ClusterTopology, Member};
use crate::framework::EventStream;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::info;

#[derive(Clone)]
pub struct MemberList {
    view: Arc<watch::Sender<Arc<Vec<Member>>>>,
    topology: EventStream<ClusterTopology>,
}

impl MemberList {
    pub fn new(initial: Vec<Member>) -> Self {
        let (view, _) = watch::channel(Arc::new(initial));
        Self {
            view: Arc::new(view),
            topology: EventStream::default(),
        }
    }

    /// Snapshot of the current members.
    pub fn members(&self) -> Arc<Vec<Member>> {
        self.view.borrow().clone()
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.view.borrow().iter().any(|m| m.id == member_id)
    }

    pub fn get(&self, member_id: &str) -> Option<Member> {
        self.view.borrow().iter().find(|m| m.id == member_id).cloned()
    }

    pub fn topology_events(&self) -> &EventStream<ClusterTopology> {
        &self.topology
    }

    pub fn subscribe_topology(&self) -> broadcast::Receiver<ClusterTopology> {
        self.topology.subscribe()
    }

    /// Replaces the view and publishes the resulting topology change.
    ///
    /// Nothing is published when the set of member ids is unchanged.
    pub fn update_members(&self, members: Vec<Member>) -> ClusterTopology {
        let next = Arc::new(members);
        let mut previous = Arc::new(Vec::new());
        self.view.send_modify(|view| {
            previous = std::mem::replace(view, next.clone());
        });

        let before: BTreeSet<String> = previous.iter().map(|m| m.id.clone()).collect();
        let after: BTreeSet<String> = next.iter().map(|m| m.id.clone()).collect();
        let topology = ClusterTopology {
            members: next.as_ref().clone(),
            joined: after.difference(&before).cloned().collect(),
            left: before.difference(&after).cloned().collect(),
        };

        if !topology.is_empty_change() {
            info!(
                joined = ?topology.joined,
                left = ?topology.left,
                size = topology.members.len(),
                "Topology changed"
            );
            self.topology.publish(topology.clone());
        }
        topology
    }

    pub fn add_member(&self, member: Member) -> ClusterTopology {
        let mut members = self.members().as_ref().clone();
        members.retain(|m| m.id != member.id);
        members.push(member);
        self.update_members(members)
    }

    pub fn remove_member(&self, member_id: &str) -> ClusterTopology {
        let mut members = self.members().as_ref().clone();
        members.retain(|m| m.id != member_id);
        self.update_members(members)
    }
}
