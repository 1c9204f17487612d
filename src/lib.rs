//! Cluster DNS
//!
//! Authoritative DNS front end for a replicated cluster. Clients discover
//! the replicas, the leader, and their ports with ordinary DNS lookups.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLUSTER DNS                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DNS Server (53/udp)   ←── A, AAAA, TXT, NS, SRV, SOA       │
//! │  Membership View       ←── Snapshot of replicas, leader 1st │
//! │  Zone Revision         ←── SOA serial, bumped per change    │
//! │  HTTP API (8053)       ←── View updates, health, metrics    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod dns;
pub mod membership;
pub mod types;
