use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    uptime_seconds: u64,
    active_signals: usize,
    connectors: usize,
    connectors_healthy: usize,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let summary = state.handles.signal_store.summary().await;
    let connectors_healthy = state.handles.connectors.iter().filter(|c| c.is_healthy()).count();

    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        active_signals: summary.total_active,
        connectors: state.handles.connectors.len(),
        connectors_healthy,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}
