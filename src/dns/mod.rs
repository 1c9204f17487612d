//! DNS Server Module
//!
//! Publishes the cluster view over DNS.
//!
//! ## DNS Records
//!
//! - A records: every replica address, leader first
//! - AAAA: acknowledged with an empty, non-authoritative answer
//! - TXT record: `<ROLE> <address>:<port>` for every replica, `;`-joined
//! - NS records: addresses of nameserver replicas
//! - SRV records on `_<service>._tcp.<domain>`: one per replica, targeting
//!   `<address>.ipaddr.<domain>`
//! - SOA record: zone authority with the current revision as serial

mod classifier;
mod handler;
mod message;
mod record;
mod revision;
mod server;
mod wire;

pub use classifier::{Classification, DomainConfig, DomainError, SupportedType};
pub use handler::{view_text, ClusterDnsHandler, DEFAULT_TTL};
pub use message::{Flags, Message, OpCode, Question, RecordClass, RecordType, ResponseCode};
pub use record::{edns_opt_record, Record, RecordData, Soa, EDNS_UDP_PAYLOAD};
pub use revision::{Clock, FixedClock, Revision, SystemClock, ZoneRevision};
pub use server::{bind_dns_socket, handle_datagram, run_dns_server};
pub use wire::{WireError, DNS_MAX_PACKET_SIZE};
