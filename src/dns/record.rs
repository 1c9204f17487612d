//! Answer records
//!
//! Typed resource records and the constructors used to render one answer
//! per record kind. Names are kept without the trailing root dot; the text
//! form adds it back.

use std::fmt;
use std::net::Ipv4Addr;

use super::message::{RecordClass, RecordType};

/// SOA timing parameters advertised for the cluster zone
pub const SOA_REFRESH_SECS: u32 = 86000;
pub const SOA_RETRY_SECS: u32 = 7200;
pub const SOA_EXPIRE_SECS: u32 = 360000;
pub const SOA_MINIMUM_SECS: u32 = 432000;

/// SRV priority and weight used for every replica
pub const SRV_PRIORITY: u16 = 0;
pub const SRV_WEIGHT: u16 = 100;

/// UDP payload size we advertise in EDNS(0) replies
pub const EDNS_UDP_PAYLOAD: u16 = 4096;

/// Zone authority payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Type-specific record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    NS(String),
    TXT(String),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    SOA(Soa),
    /// Anything else, carried as raw rdata
    Opaque { rtype: u16, data: Vec<u8> },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::NS(_) => RecordType::NS,
            RecordData::TXT(_) => RecordType::TXT,
            RecordData::SRV { .. } => RecordType::SRV,
            RecordData::SOA(_) => RecordType::SOA,
            RecordData::Opaque { rtype, .. } => RecordType::from(*rtype),
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(addr) => write!(f, "{}", addr),
            RecordData::NS(name) => write!(f, "{}.", name),
            RecordData::TXT(text) => {
                f.write_str("\"")?;
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("\"")
            }
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}.", priority, weight, port, target),
            RecordData::SOA(soa) => write!(
                f,
                "{}. {}. ({} {} {} {} {})",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            RecordData::Opaque { data, .. } => {
                // RFC 3597 generic form
                write!(f, "\\# {}", data.len())?;
                if !data.is_empty() {
                    f.write_str(" ")?;
                    for byte in data {
                        write!(f, "{:02x}", byte)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// One resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner name
    pub name: String,
    pub ttl: u32,
    pub class: RecordClass,
    pub data: RecordData,
}

impl Record {
    /// Record in class IN
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self {
            name: name.into(),
            ttl,
            class: RecordClass::IN,
            data,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {} {} {} {}",
            self.name,
            self.ttl,
            self.class,
            self.record_type(),
            self.data
        )
    }
}

/// A record for one replica address
pub fn address_record(owner: &str, ttl: u32, address: Ipv4Addr) -> Record {
    Record::new(owner, ttl, RecordData::A(address))
}

/// TXT record carrying a single string
pub fn text_record(owner: &str, ttl: u32, text: impl Into<String>) -> Record {
    Record::new(owner, ttl, RecordData::TXT(text.into()))
}

/// NS record whose payload is the nameserver's bare address
///
/// The address is published as a name made of its dotted-quad labels
/// rather than a host name.
pub fn nameserver_record(owner: &str, ttl: u32, address: Ipv4Addr) -> Record {
    Record::new(owner, ttl, RecordData::NS(address.to_string()))
}

/// SRV record with the fixed priority and weight
pub fn service_record(owner: &str, ttl: u32, port: u16, target: impl Into<String>) -> Record {
    Record::new(
        owner,
        ttl,
        RecordData::SRV {
            priority: SRV_PRIORITY,
            weight: SRV_WEIGHT,
            port,
            target: target.into(),
        },
    )
}

/// SOA record for `domain` with the given serial
pub fn authority_record(owner: &str, ttl: u32, domain: &str, serial: u32) -> Record {
    Record::new(
        owner,
        ttl,
        RecordData::SOA(Soa {
            mname: domain.to_string(),
            rname: format!("dns-admin.{}", domain),
            serial,
            refresh: SOA_REFRESH_SECS,
            retry: SOA_RETRY_SECS,
            expire: SOA_EXPIRE_SECS,
            minimum: SOA_MINIMUM_SECS,
        }),
    )
}

/// EDNS(0) OPT pseudo-record
///
/// Root owner, payload size in the class field, and a zero TTL
/// (extended rcode 0, version 0, DO clear).
pub fn edns_opt_record(payload: u16) -> Record {
    Record {
        name: String::new(),
        ttl: 0,
        class: RecordClass::from(payload),
        data: RecordData::Opaque {
            rtype: RecordType::OPT.to_u16(),
            data: Vec::new(),
        },
    }
}
