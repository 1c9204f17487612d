//! Core cluster types
//!
//! A replica is one member of the coordinated cluster as reported by the
//! membership layer. The DNS core only ever reads these.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Role a replica plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaRole {
    /// Current leader of the replicated state machine
    Leader,

    /// Regular replica
    Replica,

    /// Replica that also answers DNS for the cluster
    Nameserver,
}

impl ReplicaRole {
    /// Name used in TXT answers
    pub fn name(&self) -> &'static str {
        match self {
            ReplicaRole::Leader => "LEADER",
            ReplicaRole::Replica => "REPLICA",
            ReplicaRole::Nameserver => "NAMESERVER",
        }
    }

    /// Whether this replica should be listed in NS answers
    pub fn is_nameserver(&self) -> bool {
        matches!(self, ReplicaRole::Nameserver)
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cluster member endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// IPv4 address the replica listens on
    pub address: Ipv4Addr,

    /// Client port
    pub port: u16,

    /// Role in the cluster
    pub role: ReplicaRole,
}

impl Replica {
    pub fn new(address: Ipv4Addr, port: u16, role: ReplicaRole) -> Self {
        Self { address, port, role }
    }

    /// `<address>:<port>` endpoint string
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Same address and port, role ignored
    pub fn same_endpoint(&self, other: &Replica) -> bool {
        self.address == other.address && self.port == other.port
    }
}
