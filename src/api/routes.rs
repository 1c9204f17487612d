//! API Routes
//!
//! HTTP endpoints for health, metrics, and membership view updates.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::Metrics;
use crate::membership::{Membership, ViewUpdate};
use crate::types::Replica;

/// Shared API state
pub struct ApiState {
    pub domain: String,
    pub membership: Arc<Membership>,
    pub metrics: Arc<Metrics>,
}

/// Build the router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health_check))
        .route("/status", get(get_status))

        // Membership
        .route("/view", get(get_view).put(put_view))
        .route("/replicas", post(post_replica))
        .route("/replicas/:address/:port", delete(delete_replica))
        .route("/revision", get(get_revision))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(addr: SocketAddr, state: Arc<ApiState>) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("📊 HTTP API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Record a view mutation in the metrics
fn note_view_update(state: &ApiState, update: &ViewUpdate) {
    if update.changed {
        state.metrics.inc_view_updates();
    }
    state.metrics.set_replicas(update.replicas as u64);
}

/// GET /health - Simple health check
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// GET /status - Detailed status
async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let view = state.membership.snapshot().await;

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.metrics.uptime_secs(),
        "domain": state.domain,
        "replicas": view.len(),
        "leader": view.leader().map(|r| r.endpoint()),
        "revision": state.membership.revision().current().to_string(),
    }))
}

/// GET /view - Replicas in view order
async fn get_view(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let view = state.membership.snapshot().await;
    Json(view.replicas().to_vec())
}

/// PUT /view - Replace the whole view
async fn put_view(
    State(state): State<Arc<ApiState>>,
    Json(replicas): Json<Vec<Replica>>,
) -> impl IntoResponse {
    let update = state.membership.replace_view(replicas).await;
    note_view_update(&state, &update);

    Json(serde_json::json!({
        "revision": update.revision.to_string(),
        "changed": update.changed,
    }))
}

/// POST /replicas - Insert or update one replica
async fn post_replica(
    State(state): State<Arc<ApiState>>,
    Json(replica): Json<Replica>,
) -> impl IntoResponse {
    let update = state.membership.upsert_replica(replica).await;
    note_view_update(&state, &update);

    Json(serde_json::json!({
        "revision": update.revision.to_string(),
        "changed": update.changed,
    }))
}

/// DELETE /replicas/:address/:port - Remove one replica
async fn delete_replica(
    State(state): State<Arc<ApiState>>,
    Path((address, port)): Path<(String, u16)>,
) -> impl IntoResponse {
    let Ok(address) = address.parse::<Ipv4Addr>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid IPv4 address" })),
        );
    };

    match state.membership.remove_replica(address, port).await {
        Some(update) => {
            note_view_update(&state, &update);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "revision": update.revision.to_string() })),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "replica not in view" })),
        ),
    }
}

/// GET /revision - Current zone revision
async fn get_revision(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "revision": state.membership.revision().current().to_string(),
    }))
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let replicas = state.membership.snapshot().await.len();
    state.metrics.set_replicas(replicas as u64);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let replicas = state.membership.snapshot().await.len();
    state.metrics.set_replicas(replicas as u64);

    Json(state.metrics.to_json())
}
