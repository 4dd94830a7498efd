use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use connectors::data_source_registry;
use connector_trait::SourceRegistryEntry;
use hydra_core::{Signal, SignalCategory, SignalPriority};
use serde::{Deserialize, Serialize};
use signal_store::SignalSummary;

use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
struct SignalsQuery {
    category: Option<String>,
    priority: Option<String>,
}

fn parse_category(raw: &str) -> Option<SignalCategory> {
    match raw.to_lowercase().as_str() {
        "crypto" => Some(SignalCategory::Crypto),
        "metals" => Some(SignalCategory::Metals),
        "macro" => Some(SignalCategory::Macro),
        "equities" => Some(SignalCategory::Equities),
        "options" => Some(SignalCategory::Options),
        "rates" => Some(SignalCategory::Rates),
        "fx" => Some(SignalCategory::Fx),
        "geopolitical" => Some(SignalCategory::Geopolitical),
        "ai_disruption" => Some(SignalCategory::AiDisruption),
        "structural" => Some(SignalCategory::Structural),
        _ => None,
    }
}

fn parse_priority(raw: &str) -> Option<SignalPriority> {
    match raw.to_uppercase().as_str() {
        "CRITICAL" => Some(SignalPriority::Critical),
        "HIGH" => Some(SignalPriority::High),
        "MEDIUM" => Some(SignalPriority::Medium),
        "LOW" => Some(SignalPriority::Low),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct SignalsResponse {
    signals: Vec<Signal>,
    summary: SignalSummary,
}

async fn signals(
    State(state): State<AppState>,
    Query(query): Query<SignalsQuery>,
) -> Json<ApiResponse<SignalsResponse>> {
    let category = query.category.as_deref().and_then(parse_category);
    let min_priority = query.priority.as_deref().and_then(parse_priority);

    let signals = state.handles.signal_store.active(category, min_priority).await;
    let summary = state.handles.signal_store.summary().await;
    Json(ApiResponse::success(SignalsResponse { signals, summary }))
}

async fn signals_summary(State(state): State<AppState>) -> Json<ApiResponse<SignalSummary>> {
    Json(ApiResponse::success(state.handles.signal_store.summary().await))
}

#[derive(Debug, Serialize)]
struct SourcesResponse {
    implemented: usize,
    planned: usize,
    sources: Vec<SourceRegistryEntry>,
}

async fn sources() -> Json<ApiResponse<SourcesResponse>> {
    let sources = data_source_registry();
    let implemented = sources.iter().filter(|s| s.status == connector_trait::SourceStatus::Implemented).count();
    let planned = sources.len() - implemented;
    Json(ApiResponse::success(SourcesResponse { implemented, planned, sources }))
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    summary: SignalSummary,
    signals: Vec<Signal>,
    sources: SourcesResponse,
}

/// Composes the signal summary, active signals, and the source registry into
/// one payload, matching the original's `export_dashboard_data` (§10.5).
async fn dashboard(State(state): State<AppState>) -> Json<ApiResponse<DashboardResponse>> {
    let signals = state.handles.signal_store.active(None, None).await;
    let summary = SignalSummary::build(&signals);
    let registry = data_source_registry();
    let implemented = registry.iter().filter(|s| s.status == connector_trait::SourceStatus::Implemented).count();
    let planned = registry.len() - implemented;

    Json(ApiResponse::success(DashboardResponse {
        summary,
        signals,
        sources: SourcesResponse { implemented, planned, sources: registry },
    }))
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    new_signals: usize,
    total_active: usize,
}

async fn scan(State(state): State<AppState>) -> Json<ApiResponse<ScanResponse>> {
    let new_signals = hydra_worker::run_scan_once(&state.handles).await;
    let total_active = state.handles.signal_store.summary().await.total_active;
    Json(ApiResponse::success(ScanResponse { new_signals, total_active }))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    hours: Option<i64>,
}

#[derive(Debug, Serialize)]
struct EventWithCountdown {
    name: String,
    category: String,
    importance: String,
    scheduled_at: chrono::DateTime<chrono::Utc>,
    minutes_until: i64,
}

async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<EventWithCountdown>>> {
    let now = chrono::Utc::now();
    let hours = query.hours.unwrap_or(24).max(1);

    let upcoming: Vec<EventWithCountdown> = state
        .handles
        .calendar
        .upcoming(now, hours)
        .into_iter()
        .map(|e| EventWithCountdown {
            name: e.name.clone(),
            category: e.category.clone(),
            importance: e.importance.clone(),
            scheduled_at: e.scheduled_at(),
            minutes_until: (e.scheduled_at() - now).num_minutes(),
        })
        .collect();

    Json(ApiResponse::success(upcoming))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/signals", get(signals))
        .route("/api/signals/summary", get(signals_summary))
        .route("/api/sources", get(sources))
        .route("/api/dashboard", get(dashboard))
        .route("/api/scan", post(scan))
        .route("/api/events", get(events))
}
