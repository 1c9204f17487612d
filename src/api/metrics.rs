//! Metrics Collection
//!
//! Counters for the DNS loop and membership updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the responder
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Datagrams read from the DNS socket
    pub datagrams_received: AtomicU64,

    /// Datagrams that failed to decode
    pub malformed_datagrams: AtomicU64,

    /// Responses written back
    pub responses_sent: AtomicU64,

    /// Queries left unanswered (out of scope or unsupported)
    pub silent_drops: AtomicU64,

    /// Responses cut down to fit the client's payload size
    pub truncated_responses: AtomicU64,

    /// Failed sends
    pub send_errors: AtomicU64,

    /// View changes applied through the API
    pub view_updates: AtomicU64,

    /// Replicas in the current view
    pub replicas: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_datagrams_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_responses_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_silent_drops(&self) {
        self.silent_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_truncated(&self) {
        self.truncated_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_send_errors(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_view_updates(&self) {
        self.view_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Update replica count
    pub fn set_replicas(&self, count: u64) {
        self.replicas.store(count, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        push_metric(
            &mut output,
            "uptime_seconds",
            "gauge",
            "Responder uptime in seconds",
            self.uptime_secs(),
        );

        let counters: [(&str, &str, &AtomicU64); 7] = [
            ("datagrams_received_total", "Datagrams received", &self.datagrams_received),
            ("malformed_datagrams_total", "Undecodable datagrams", &self.malformed_datagrams),
            ("responses_sent_total", "Responses sent", &self.responses_sent),
            ("silent_drops_total", "Queries left unanswered", &self.silent_drops),
            ("truncated_responses_total", "Responses with TC set", &self.truncated_responses),
            ("send_errors_total", "Failed response sends", &self.send_errors),
            ("view_updates_total", "Replica view changes", &self.view_updates),
        ];
        for (name, help, counter) in counters {
            push_metric(&mut output, name, "counter", help, counter.load(Ordering::Relaxed));
        }

        push_metric(
            &mut output,
            "replicas",
            "gauge",
            "Replicas in the current view",
            self.replicas.load(Ordering::Relaxed),
        );

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "dns": {
                "datagrams_received": self.datagrams_received.load(Ordering::Relaxed),
                "malformed": self.malformed_datagrams.load(Ordering::Relaxed),
                "responses_sent": self.responses_sent.load(Ordering::Relaxed),
                "silent_drops": self.silent_drops.load(Ordering::Relaxed),
                "truncated": self.truncated_responses.load(Ordering::Relaxed),
                "send_errors": self.send_errors.load(Ordering::Relaxed),
            },
            "membership": {
                "view_updates": self.view_updates.load(Ordering::Relaxed),
                "replicas": self.replicas.load(Ordering::Relaxed),
            },
        })
    }
}

fn push_metric(output: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    output.push_str(&format!(
        "# HELP cluster_dns_{name} {help}\n\
         # TYPE cluster_dns_{name} {kind}\n\
         cluster_dns_{name} {value}\n\n"
    ));
}
