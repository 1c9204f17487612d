//! Replica View
//!
//! Immutable, ordered snapshot of the cluster membership.

use serde::Serialize;
use std::net::Ipv4Addr;

use crate::types::{Replica, ReplicaRole};

/// Point-in-time list of replicas, in the order the membership layer
/// supplied them (leader first when it knows one)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReplicaView {
    replicas: Vec<Replica>,
}

impl ReplicaView {
    pub fn new(replicas: Vec<Replica>) -> Self {
        Self { replicas }
    }

    pub fn replicas(&self) -> &[Replica] {
        &self.replicas
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Replica addresses in view order
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.replicas.iter().map(|r| r.address)
    }

    /// `(address, port)` for every replica, in view order
    pub fn address_port_pairs(&self) -> impl Iterator<Item = (Ipv4Addr, u16)> + '_ {
        self.replicas.iter().map(|r| (r.address, r.port))
    }

    /// Replicas that also serve DNS
    pub fn nameservers(&self) -> impl Iterator<Item = &Replica> + '_ {
        self.replicas.iter().filter(|r| r.role.is_nameserver())
    }

    pub fn leader(&self) -> Option<&Replica> {
        self.replicas.iter().find(|r| r.role == ReplicaRole::Leader)
    }

    pub fn contains_address(&self, address: Ipv4Addr) -> bool {
        self.replicas.iter().any(|r| r.address == address)
    }
}
