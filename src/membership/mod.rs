//! Membership Module
//!
//! Holds the replica view published by the cluster's membership layer.
//! Readers take an `Arc` snapshot so a single DNS response never mixes two
//! views; writers swap in a new snapshot and advance the zone revision.

mod view;

pub use view::ReplicaView;

use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::dns::{Revision, ZoneRevision};
use crate::types::{Replica, ReplicaRole};

/// Outcome of one view mutation, observed under the write lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewUpdate {
    /// Revision in effect afterwards
    pub revision: Revision,

    /// Whether the view changed
    pub changed: bool,

    /// Replicas in the resulting view
    pub replicas: usize,
}

/// Current cluster view plus its zone revision
pub struct Membership {
    /// Latest snapshot
    view: RwLock<Arc<ReplicaView>>,

    /// SOA serial, advanced on every view change
    revision: Arc<ZoneRevision>,
}

impl Membership {
    /// Create with an initial view
    pub fn new(replicas: Vec<Replica>, revision: Arc<ZoneRevision>) -> Self {
        Self {
            view: RwLock::new(Arc::new(ReplicaView::new(replicas))),
            revision,
        }
    }

    /// Current view snapshot
    pub async fn snapshot(&self) -> Arc<ReplicaView> {
        self.view.read().await.clone()
    }

    pub fn revision(&self) -> &Arc<ZoneRevision> {
        &self.revision
    }

    fn unchanged(&self, view: &ReplicaView) -> ViewUpdate {
        ViewUpdate {
            revision: self.revision.current(),
            changed: false,
            replicas: view.len(),
        }
    }

    fn publish(&self, view: &mut Arc<ReplicaView>, replicas: Vec<Replica>) -> ViewUpdate {
        *view = Arc::new(ReplicaView::new(replicas));
        ViewUpdate {
            revision: self.revision.update(),
            changed: true,
            replicas: view.len(),
        }
    }

    /// Replace the whole view
    ///
    /// An identical view does not advance the revision.
    pub async fn replace_view(&self, replicas: Vec<Replica>) -> ViewUpdate {
        let mut view = self.view.write().await;
        if view.replicas() == replicas.as_slice() {
            return self.unchanged(&view);
        }

        let update = self.publish(&mut view, replicas);
        info!(
            "Replica view replaced: {} replicas, revision {}",
            update.replicas, update.revision
        );
        update
    }

    /// Insert or update one replica
    ///
    /// An existing address:port keeps its position. A replica arriving as
    /// leader moves to the front and the previous leader becomes a plain
    /// replica.
    pub async fn upsert_replica(&self, replica: Replica) -> ViewUpdate {
        let mut view = self.view.write().await;
        let mut replicas = view.replicas().to_vec();

        if replicas.iter().any(|r| r == &replica) {
            return self.unchanged(&view);
        }

        let existing = replicas.iter().position(|r| r.same_endpoint(&replica));

        if replica.role == ReplicaRole::Leader {
            if let Some(index) = existing {
                replicas.remove(index);
            }
            for r in replicas.iter_mut().filter(|r| r.role == ReplicaRole::Leader) {
                r.role = ReplicaRole::Replica;
            }
            replicas.insert(0, replica.clone());
        } else {
            match existing {
                Some(index) => replicas[index] = replica.clone(),
                None => replicas.push(replica.clone()),
            }
        }

        let update = self.publish(&mut view, replicas);
        debug!(
            "Replica {} upserted as {}, revision {}",
            replica.endpoint(),
            replica.role,
            update.revision
        );
        update
    }

    /// Remove the replica at `address:port`
    ///
    /// Returns `None` when no such replica is in the view.
    pub async fn remove_replica(&self, address: Ipv4Addr, port: u16) -> Option<ViewUpdate> {
        let mut view = self.view.write().await;
        let mut replicas = view.replicas().to_vec();
        let before = replicas.len();
        replicas.retain(|r| !(r.address == address && r.port == port));

        if replicas.len() == before {
            return None;
        }

        let update = self.publish(&mut view, replicas);
        debug!("Replica {}:{} removed, revision {}", address, port, update.revision);
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(last: u8, role: ReplicaRole) -> Replica {
        Replica::new(Ipv4Addr::new(10, 0, 0, last), 14000, role)
    }

    fn membership(replicas: Vec<Replica>) -> Membership {
        Membership::new(replicas, Arc::new(ZoneRevision::new()))
    }

    fn roles(view: &ReplicaView) -> Vec<(u8, ReplicaRole)> {
        view.replicas()
            .iter()
            .map(|r| (r.address.octets()[3], r.role))
            .collect()
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_updates() {
        let membership = membership(vec![replica(1, ReplicaRole::Leader)]);

        let before = membership.snapshot().await;
        let replicas = vec![replica(2, ReplicaRole::Leader), replica(3, ReplicaRole::Replica)];
        membership.replace_view(replicas).await;
        let after = membership.snapshot().await;

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_view_advances_revision() {
        let membership = membership(vec![replica(1, ReplicaRole::Leader)]);
        let start = membership.revision().current();

        let update = membership
            .replace_view(vec![replica(2, ReplicaRole::Leader)])
            .await;
        assert!(update.changed);
        assert!(update.revision > start);
        assert_eq!(update.replicas, 1);

        // Same view again is a no-op
        let again = membership
            .replace_view(vec![replica(2, ReplicaRole::Leader)])
            .await;
        assert!(!again.changed);
        assert_eq!(again.revision, update.revision);
    }

    #[tokio::test]
    async fn test_concurrent_replaces_report_one_change() {
        let membership = Arc::new(membership(vec![replica(1, ReplicaRole::Leader)]));
        let target = vec![replica(2, ReplicaRole::Leader), replica(3, ReplicaRole::Replica)];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let membership = membership.clone();
                let target = target.clone();
                tokio::spawn(async move { membership.replace_view(target).await })
            })
            .collect();

        let mut changed = 0;
        for handle in handles {
            if handle.await.unwrap().changed {
                changed += 1;
            }
        }
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn test_upsert_appends_and_updates_in_place() {
        let membership = membership(vec![
            replica(1, ReplicaRole::Leader),
            replica(2, ReplicaRole::Replica),
        ]);

        membership.upsert_replica(replica(3, ReplicaRole::Replica)).await;
        membership.upsert_replica(replica(2, ReplicaRole::Nameserver)).await;

        let view = membership.snapshot().await;
        assert_eq!(
            roles(&view),
            vec![
                (1, ReplicaRole::Leader),
                (2, ReplicaRole::Nameserver),
                (3, ReplicaRole::Replica),
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_leader_moves_first() {
        let membership = membership(vec![
            replica(1, ReplicaRole::Leader),
            replica(2, ReplicaRole::Replica),
            replica(3, ReplicaRole::Replica),
        ]);

        membership.upsert_replica(replica(3, ReplicaRole::Leader)).await;

        let view = membership.snapshot().await;
        assert_eq!(
            roles(&view),
            vec![
                (3, ReplicaRole::Leader),
                (1, ReplicaRole::Replica),
                (2, ReplicaRole::Replica),
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_unchanged_keeps_revision() {
        let membership = membership(vec![replica(1, ReplicaRole::Leader)]);
        let start = membership.revision().current();

        let update = membership.upsert_replica(replica(1, ReplicaRole::Leader)).await;
        assert!(!update.changed);
        assert_eq!(update.revision, start);

        let update = membership.upsert_replica(replica(2, ReplicaRole::Replica)).await;
        assert!(update.changed);
        assert_eq!(update.replicas, 2);
    }

    #[tokio::test]
    async fn test_remove_replica() {
        let membership = membership(vec![
            replica(1, ReplicaRole::Leader),
            replica(2, ReplicaRole::Replica),
        ]);

        let address = Ipv4Addr::new(10, 0, 0, 2);
        let update = membership.remove_replica(address, 14000).await.unwrap();
        assert!(update.changed);
        assert_eq!(update.replicas, 1);
        assert!(membership.remove_replica(address, 14000).await.is_none());
        assert_eq!(membership.snapshot().await.len(), 1);
    }
}
