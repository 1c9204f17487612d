//! Simple DNS Server
//!
//! One UDP socket; each datagram is decoded, answered and replied to
//! before the next one is read.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::api::Metrics;
use crate::dns::{edns_opt_record, ClusterDnsHandler, Message, EDNS_UDP_PAYLOAD};

/// Largest datagram we accept
const UDP_MAX_LEN: usize = 65535;

/// Bind the DNS socket
///
/// Failure here is fatal for the service.
pub async fn bind_dns_socket(addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Can't bind to UDP {}: {}", addr, e))?;
    info!("🌐 DNS server listening on {}", socket.local_addr()?);
    Ok(socket)
}

/// Run the DNS server loop
pub async fn run_dns_server(
    socket: UdpSocket,
    handler: Arc<ClusterDnsHandler>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; UDP_MAX_LEN];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                debug!("Received a message from {}", src);
                metrics.inc_datagrams_received();

                let response = handle_datagram(&buf[..len], src, &handler, &metrics).await;
                if let Some(response) = response {
                    match socket.send_to(&response, src).await {
                        Ok(_) => metrics.inc_responses_sent(),
                        Err(e) => {
                            metrics.inc_send_errors();
                            debug!("DNS send error to {}: {}", src, e);
                        }
                    }
                }
            }
            Err(e) => {
                error!("DNS socket error: {}", e);
            }
        }
    }
}

/// Decode, answer and encode one datagram
///
/// Returns the bytes to send back, or `None` when nothing should be sent.
pub async fn handle_datagram(
    request: &[u8],
    src: SocketAddr,
    handler: &ClusterDnsHandler,
    metrics: &Metrics,
) -> Option<Vec<u8>> {
    let query = match Message::decode(request) {
        Ok(query) => query,
        Err(e) => {
            metrics.inc_malformed();
            debug!("Malformed DNS message from {}: {}", src, e);
            return None;
        }
    };

    let Some(mut response) = handler.handle(&query).await else {
        metrics.inc_silent_drops();
        return None;
    };

    if query.edns_payload_size().is_some() {
        response.additionals.push(edns_opt_record(EDNS_UDP_PAYLOAD));
    }

    match response.encode_with_limit(query.max_response_size()) {
        Ok((bytes, truncated)) => {
            if truncated {
                metrics.inc_truncated();
                debug!("Response to {} truncated", src);
            }
            Some(bytes)
        }
        Err(e) => {
            error!("Failed to encode response for {}: {}", src, e);
            None
        }
    }
}
