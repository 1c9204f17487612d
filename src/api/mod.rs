//! HTTP API Module
//!
//! Health and metrics endpoints, plus the ingress through which the
//! membership layer pushes view changes.

mod metrics;
mod routes;

pub use metrics::Metrics;
pub use routes::{router, run_api_server, ApiState};
