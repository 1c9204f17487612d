//! Query classification
//!
//! Decides whether a question targets this responder's zone and whether
//! its record type is one we answer.

use std::net::Ipv4Addr;

use super::message::{Question, RecordType};

/// Label that introduces address-literal names under the domain
const ADDRESS_LITERAL_LABEL: &str = "ipaddr";

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Domain validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("a DNS domain name is required")]
    Empty,

    #[error("domain name contains an empty label: {0}")]
    EmptyLabel(String),

    #[error("label '{0}' is longer than 63 octets")]
    LabelTooLong(String),

    #[error("domain name is longer than 253 octets")]
    TooLong,

    #[error("label '{0}' contains invalid characters")]
    InvalidCharacter(String),

    #[error("service tag must be a single non-empty label")]
    InvalidServiceTag,
}

/// Record types this responder answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedType {
    Address,
    Address6,
    Text,
    NameServer,
    Service,
    ZoneAuthority,
}

impl SupportedType {
    pub fn from_record_type(rtype: RecordType) -> Option<Self> {
        match rtype {
            RecordType::A => Some(SupportedType::Address),
            RecordType::AAAA => Some(SupportedType::Address6),
            RecordType::TXT => Some(SupportedType::Text),
            RecordType::NS => Some(SupportedType::NameServer),
            RecordType::SRV => Some(SupportedType::Service),
            RecordType::SOA => Some(SupportedType::ZoneAuthority),
            RecordType::OPT | RecordType::Other(_) => None,
        }
    }
}

/// Outcome of classifying one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// In scope and supported
    Answer(SupportedType),

    /// A query for `<ipv4>.ipaddr.<domain>`
    AddressLiteral(Ipv4Addr),

    /// Name is not served here
    OutOfScope,

    /// Name is served but the type is not
    Unsupported(RecordType),
}

/// Names this responder is authoritative for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    /// Configured domain, lowercase, no trailing dot
    domain: String,

    /// `_<service>._tcp.<domain>`
    service_domain: String,

    /// `ipaddr.<domain>`
    address_domain: String,
}

impl DomainConfig {
    /// Validate `domain` and derive the service-discovery names
    pub fn new(domain: &str, service_tag: &str) -> Result<Self, DomainError> {
        let domain = normalize(domain);
        validate_domain(&domain)?;

        // The tag becomes the label `_<tag>`
        let service_tag = service_tag.trim().to_ascii_lowercase();
        if service_tag.is_empty()
            || service_tag.len() > MAX_LABEL_LEN - 1
            || !valid_label(&service_tag)
        {
            return Err(DomainError::InvalidServiceTag);
        }

        let service_domain = format!("_{}._tcp.{}", service_tag, domain);
        if service_domain.len() > MAX_DOMAIN_LEN {
            return Err(DomainError::TooLong);
        }

        Ok(Self {
            service_domain,
            address_domain: format!("{}.{}", ADDRESS_LITERAL_LABEL, domain),
            domain,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn service_domain(&self) -> &str {
        &self.service_domain
    }

    /// SRV target for a replica address, `<address>.ipaddr.<domain>`
    pub fn address_target(&self, address: Ipv4Addr) -> String {
        format!("{}.{}", address, self.address_domain)
    }

    /// Name is the domain itself, or the service domain for SRV
    pub fn in_scope(&self, question: &Question) -> bool {
        let name = normalize(&question.name);
        name == self.domain || (question.qtype == RecordType::SRV && name == self.service_domain)
    }

    pub fn is_supported(&self, question: &Question) -> bool {
        SupportedType::from_record_type(question.qtype).is_some()
    }

    /// Parse `<ipv4>.ipaddr.<domain>` names
    pub fn address_literal(&self, name: &str) -> Option<Ipv4Addr> {
        let name = normalize(name);
        let prefix = name.strip_suffix(&self.address_domain)?.strip_suffix('.')?;
        prefix.parse().ok()
    }

    pub fn classify(&self, question: &Question) -> Classification {
        if self.in_scope(question) {
            return match SupportedType::from_record_type(question.qtype) {
                Some(supported) => Classification::Answer(supported),
                None => Classification::Unsupported(question.qtype),
            };
        }

        if question.qtype == RecordType::A {
            if let Some(address) = self.address_literal(&question.name) {
                return Classification::AddressLiteral(address);
            }
        }

        Classification::OutOfScope
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() {
        return Err(DomainError::Empty);
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(DomainError::TooLong);
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(DomainError::EmptyLabel(domain.to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::LabelTooLong(label.to_string()));
        }
        if !valid_label(label) {
            return Err(DomainError::InvalidCharacter(label.to_string()));
        }
    }

    Ok(())
}

/// Letters, digits, `-` and `_`, with no hyphen at either end
fn valid_label(label: &str) -> bool {
    label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::RecordClass;

    fn config() -> DomainConfig {
        DomainConfig::new("cluster.example.org", "cluster").unwrap()
    }

    fn question(name: &str, qtype: RecordType) -> Question {
        Question::new(name, qtype, RecordClass::IN)
    }

    #[test]
    fn test_derived_names() {
        let config = DomainConfig::new("Cluster.Example.org.", "cluster").unwrap();
        assert_eq!(config.domain(), "cluster.example.org");
        assert_eq!(config.service_domain(), "_cluster._tcp.cluster.example.org");
        assert_eq!(
            config.address_target(Ipv4Addr::new(10, 0, 0, 1)),
            "10.0.0.1.ipaddr.cluster.example.org"
        );
    }

    #[test]
    fn test_invalid_domains() {
        assert_eq!(DomainConfig::new("", "cluster"), Err(DomainError::Empty));
        assert_eq!(DomainConfig::new(".", "cluster"), Err(DomainError::Empty));
        assert!(matches!(
            DomainConfig::new("cluster..example", "cluster"),
            Err(DomainError::EmptyLabel(_))
        ));
        assert!(matches!(
            DomainConfig::new("bad name.example", "cluster"),
            Err(DomainError::InvalidCharacter(_))
        ));
        assert!(matches!(
            DomainConfig::new(&format!("{}.example", "a".repeat(64)), "cluster"),
            Err(DomainError::LabelTooLong(_))
        ));
        assert_eq!(
            DomainConfig::new("cluster.example", "a.b"),
            Err(DomainError::InvalidServiceTag)
        );
    }

    #[test]
    fn test_invalid_service_tags() {
        for tag in ["", "  ", "bad tag!", "a.b", "-edge", "edge-", "tag/x", "ünï"] {
            assert_eq!(
                DomainConfig::new("cluster.example.org", tag),
                Err(DomainError::InvalidServiceTag),
                "tag {:?}",
                tag
            );
        }
        assert_eq!(
            DomainConfig::new("cluster.example.org", &"t".repeat(63)),
            Err(DomainError::InvalidServiceTag)
        );

        let config = DomainConfig::new("cluster.example.org", "My_Service-2").unwrap();
        assert_eq!(config.service_domain(), "_my_service-2._tcp.cluster.example.org");
    }

    #[test]
    fn test_in_scope() {
        let config = config();
        assert!(config.in_scope(&question("cluster.example.org", RecordType::A)));
        assert!(config.in_scope(&question("CLUSTER.example.org.", RecordType::TXT)));
        assert!(config.in_scope(&question("_cluster._tcp.cluster.example.org", RecordType::SRV)));
        assert!(!config.in_scope(&question("_cluster._tcp.cluster.example.org", RecordType::A)));
        assert!(!config.in_scope(&question("other.example.org", RecordType::A)));
        assert!(!config.in_scope(&question("www.cluster.example.org", RecordType::A)));
    }

    #[test]
    fn test_is_supported() {
        let config = config();
        for rtype in [
            RecordType::A,
            RecordType::AAAA,
            RecordType::TXT,
            RecordType::NS,
            RecordType::SRV,
            RecordType::SOA,
        ] {
            assert!(config.is_supported(&question("cluster.example.org", rtype)));
        }
        assert!(!config.is_supported(&question("cluster.example.org", RecordType::Other(15))));
        assert!(!config.is_supported(&question("cluster.example.org", RecordType::OPT)));
    }

    #[test]
    fn test_classify() {
        let config = config();
        assert_eq!(
            config.classify(&question("cluster.example.org", RecordType::SOA)),
            Classification::Answer(SupportedType::ZoneAuthority)
        );
        assert_eq!(
            config.classify(&question("cluster.example.org", RecordType::Other(255))),
            Classification::Unsupported(RecordType::Other(255))
        );
        assert_eq!(
            config.classify(&question("example.com", RecordType::A)),
            Classification::OutOfScope
        );
        assert_eq!(
            config.classify(&question("10.0.0.7.ipaddr.cluster.example.org", RecordType::A)),
            Classification::AddressLiteral(Ipv4Addr::new(10, 0, 0, 7))
        );
        assert_eq!(
            config.classify(&question("10.0.0.7.ipaddr.cluster.example.org", RecordType::TXT)),
            Classification::OutOfScope
        );
        assert_eq!(
            config.classify(&question("host.ipaddr.cluster.example.org", RecordType::A)),
            Classification::OutOfScope
        );
    }
}
