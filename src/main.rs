//! Cluster DNS responder
//!
//! Serves the cluster's replica view over DNS and accepts view updates
//! from the membership layer over HTTP.

use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use cluster_dns::api::{self, ApiState, Metrics};
use cluster_dns::config::NameserverConfig;
use cluster_dns::dns::{self, ClusterDnsHandler, ZoneRevision};
use cluster_dns::membership::Membership;

/// Cluster DNS - replica discovery over DNS
#[derive(Parser, Debug)]
#[command(name = "cluster-dns")]
#[command(version)]
#[command(about = "Authoritative DNS front end for a replicated cluster", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cluster-dns.toml")]
    config: PathBuf,

    /// Domain to serve (required unless set in the config file)
    #[arg(short = 'n', long)]
    domain: Option<String>,

    /// Address to bind (defaults to this host's own address)
    #[arg(short, long)]
    bind: Option<Ipv4Addr>,

    /// DNS server port (requires root or CAP_NET_BIND_SERVICE for port 53)
    #[arg(long)]
    dns_port: Option<u16>,

    /// HTTP API port
    #[arg(long)]
    api_port: Option<u16>,

    /// Do not start the HTTP API
    #[arg(long)]
    no_api: bool,

    /// Service tag used in `_<tag>._tcp.<domain>`
    #[arg(long)]
    service_tag: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log every query and response
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if args.config.exists() {
        Some(NameserverConfig::load(&args.config)?)
    } else {
        None
    };
    let config_missing = config.is_none();

    // Override config with CLI args
    let config = config
        .unwrap_or_default()
        .with_domain(args.domain)
        .with_service_tag(args.service_tag)
        .with_bind_address(args.bind)
        .with_dns_port(args.dns_port)
        .with_api_port(args.api_port)
        .with_api_enabled(!args.no_api)
        .with_debug(args.debug);

    // Initialize logging
    let log_level = if config.debug {
        "debug".to_string()
    } else {
        args.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .init();

    info!("🌐 Cluster DNS v{}", env!("CARGO_PKG_VERSION"));
    if config_missing {
        warn!("Config file {:?} not found, using defaults", args.config);
    }

    config.validate()?;
    let domain = config.domain_config()?;

    info!("⚙️  Configuration:");
    info!("   Domain: {}", domain.domain());
    info!("   Service domain: {}", domain.service_domain());
    info!("   Record TTL: {}s", config.record_ttl_secs);
    info!("   Initial replicas: {}", config.replicas.len());

    let metrics = Arc::new(Metrics::new());
    metrics.set_replicas(config.replicas.len() as u64);

    let revision = Arc::new(ZoneRevision::new());
    info!("📝 Zone revision {}", revision.current());

    let membership = Arc::new(Membership::new(config.replicas.clone(), revision));

    // Bind before spawning anything; failure here is fatal
    let socket = dns::bind_dns_socket(config.dns_addr()).await?;

    let handler = Arc::new(ClusterDnsHandler::new(
        membership.clone(),
        domain.clone(),
        config.record_ttl_secs,
    ));

    let dns_handle = tokio::spawn(dns::run_dns_server(socket, handler, metrics.clone()));

    let api_handle = if config.api_enabled {
        let state = Arc::new(ApiState {
            domain: domain.domain().to_string(),
            membership: membership.clone(),
            metrics: metrics.clone(),
        });
        Some(tokio::spawn(api::run_api_server(config.api_addr(), state)))
    } else {
        None
    };

    info!("✅ All services started");
    info!("   Press Ctrl+C to shutdown");

    let api_exit = async {
        match api_handle {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = dns_handle => {
            error!("DNS server exited: {:?}", result);
        }
        result = api_exit => {
            error!("HTTP API exited: {:?}", result);
        }
    }

    info!("👋 Cluster DNS shutting down");
    Ok(())
}
