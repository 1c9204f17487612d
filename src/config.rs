//! Responder Configuration
//!
//! Loaded from TOML, then overridden from the command line.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::Path;
use tracing::debug;

use crate::dns::{DomainConfig, DEFAULT_TTL};
use crate::types::Replica;

/// Main configuration for the responder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NameserverConfig {
    // === Zone ===

    /// Domain this responder is authoritative for
    pub domain: String,

    /// Service tag in `_<tag>._tcp.<domain>`
    pub service_tag: String,

    /// TTL on every answer (seconds)
    pub record_ttl_secs: u32,

    // === Network ===

    /// Address to bind; the host's own address when unset
    pub bind_address: Option<Ipv4Addr>,

    /// UDP port for DNS
    pub dns_port: u16,

    /// Port for the HTTP API
    pub api_port: u16,

    /// Serve the HTTP API
    pub api_enabled: bool,

    // === Diagnostics ===

    /// Per-query debug logging
    pub debug: bool,

    // === Membership ===

    /// Initial replica view, leader first
    pub replicas: Vec<Replica>,
}

impl Default for NameserverConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            service_tag: "cluster".to_string(),
            record_ttl_secs: DEFAULT_TTL,

            bind_address: None,
            dns_port: 53,
            api_port: 8053,
            api_enabled: true,

            debug: false,

            replicas: Vec::new(),
        }
    }
}

impl NameserverConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        if let Some(domain) = domain {
            self.domain = domain;
        }
        self
    }

    pub fn with_service_tag(mut self, tag: Option<String>) -> Self {
        if let Some(tag) = tag {
            self.service_tag = tag;
        }
        self
    }

    pub fn with_bind_address(mut self, address: Option<Ipv4Addr>) -> Self {
        if address.is_some() {
            self.bind_address = address;
        }
        self
    }

    pub fn with_dns_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.dns_port = port;
        }
        self
    }

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn with_api_enabled(mut self, enabled: bool) -> Self {
        self.api_enabled = self.api_enabled && enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = self.debug || debug;
        self
    }

    /// Validated zone names
    pub fn domain_config(&self) -> anyhow::Result<DomainConfig> {
        Ok(DomainConfig::new(&self.domain, &self.service_tag)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        self.domain_config()?;

        if self.api_enabled && self.api_port == self.dns_port && self.api_port != 0 {
            anyhow::bail!(
                "api_port ({}) must differ from dns_port ({})",
                self.api_port,
                self.dns_port
            );
        }

        Ok(())
    }

    /// Address the DNS socket binds to
    pub fn resolve_bind_address(&self) -> Ipv4Addr {
        self.bind_address
            .or_else(discover_own_address)
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    pub fn dns_addr(&self) -> SocketAddr {
        SocketAddr::from((self.resolve_bind_address(), self.dns_port))
    }

    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.api_port))
    }
}

/// Address of the interface that carries outbound traffic
///
/// Connecting a UDP socket only selects a route; nothing is sent.
pub fn discover_own_address() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:53").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(addr) if !addr.is_unspecified() => {
            debug!("Discovered own address {}", addr);
            Some(addr)
        }
        _ => None,
    }
}
