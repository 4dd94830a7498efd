use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use dark_pool_mapper::DarkPoolSnapshot;
use flow_decoder::FlowSnapshot;
use gex_engine::GexSnapshot;
use hydra_core::BlowupResult;
use predator_intelligence::{ConvictionBreakdown, IntelligenceSnapshot};
use sequence_matcher::SequenceAnalysis;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    count: Option<usize>,
}

async fn blowup(State(state): State<AppState>) -> Json<ApiResponse<BlowupResult>> {
    let result = match state.handles.scorer.last().await {
        Some(result) => result,
        None => hydra_worker::run_scorer_tick(&state.handles).await,
    };
    Json(ApiResponse::success(result))
}

#[derive(Debug, Serialize)]
struct BlowupHistoryResponse {
    scores: Vec<BlowupResult>,
    count: usize,
}

async fn blowup_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiResponse<BlowupHistoryResponse>> {
    let n = query.count.unwrap_or(50);
    let scores = state.handles.scorer.recent(n).await;
    let count = scores.len();
    Json(ApiResponse::success(BlowupHistoryResponse { scores, count }))
}

/// `/api/intelligence` never errors: the aggregator's snapshot already
/// substitutes defined defaults for every absent subsystem (§4.7).
async fn intelligence(State(state): State<AppState>) -> Json<ApiResponse<IntelligenceSnapshot>> {
    Json(ApiResponse::success(state.handles.aggregator.snapshot().await))
}

/// Same shape as `/api/intelligence`; kept as a distinct path because the
/// original system surfaced it under a separate, auxiliary-heavy dashboard
/// view (§10.5's "two variants" note applies to connectors, not this route).
async fn predator(State(state): State<AppState>) -> Json<ApiResponse<IntelligenceSnapshot>> {
    Json(ApiResponse::success(state.handles.aggregator.snapshot().await))
}

async fn gex(State(state): State<AppState>) -> Json<ApiResponse<GexSnapshot>> {
    let snapshot = state.handles.gex_engine.calculate(&state.handles.config.primary_ticker).await;
    state.handles.aggregator.publish_gamma(snapshot.clone()).await;
    Json(ApiResponse::success(snapshot))
}

async fn flow(State(state): State<AppState>) -> Json<ApiResponse<FlowSnapshot>> {
    let snapshot = state.handles.flow_decoder.calculate(&state.handles.config.primary_ticker).await;
    state.handles.aggregator.publish_flow(snapshot.clone()).await;
    Json(ApiResponse::success(snapshot))
}

async fn dark_pool(State(state): State<AppState>) -> Json<ApiResponse<DarkPoolSnapshot>> {
    let snapshot = state.handles.dark_pool_mapper.calculate(&state.handles.config.primary_ticker).await;
    state.handles.aggregator.publish_dark_pool(snapshot.clone()).await;
    Json(ApiResponse::success(snapshot))
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)] // trade_direction is accepted for API-shape parity; analyze() is direction-agnostic
struct SequenceRequest {
    trade_direction: String,
}

async fn sequence_analyze(
    State(state): State<AppState>,
    Json(_body): Json<SequenceRequest>,
) -> Json<ApiResponse<SequenceAnalysis>> {
    let fingerprint = state.handles.aggregator.build_fingerprint().await;
    let analysis = state.handles.sequence_matcher.analyze(fingerprint).await;
    state.handles.aggregator.publish_sequence(analysis.clone()).await;
    Json(ApiResponse::success(analysis))
}

#[derive(Debug, Deserialize)]
struct ConvictionRequest {
    trade_direction: String,
    entry: f64,
    stop: f64,
    target: f64,
}

async fn conviction(
    State(state): State<AppState>,
    Json(body): Json<ConvictionRequest>,
) -> Json<ApiResponse<ConvictionBreakdown>> {
    let breakdown = state
        .handles
        .aggregator
        .conviction(&body.trade_direction, body.entry, body.stop, body.target)
        .await;
    Json(ApiResponse::success(breakdown))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/blowup", get(blowup))
        .route("/api/blowup/history", get(blowup_history))
        .route("/api/intelligence", get(intelligence))
        .route("/api/predator", get(predator))
        .route("/api/gex", get(gex))
        .route("/api/flow", get(flow))
        .route("/api/darkpool", get(dark_pool))
        .route("/api/sequence/analyze", post(sequence_analyze))
        .route("/api/conviction", post(conviction))
}
