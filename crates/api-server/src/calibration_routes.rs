use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use hydra_core::{TradeFeedback, Weights};
use serde::{Deserialize, Serialize};
use weight_calibrator::{CalibrationOutcome, TradeStats};

use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
struct TradeResultResponse {
    status: &'static str,
    trade_id: String,
    recorded: bool,
}

async fn trade_result(
    State(state): State<AppState>,
    Json(feedback): Json<TradeFeedback>,
) -> Json<ApiResponse<TradeResultResponse>> {
    let trade_id = feedback.trade_id.clone();
    match state.handles.calibrator.record_feedback(&feedback).await {
        Ok(recorded) => Json(ApiResponse::success(TradeResultResponse { status: "ok", trade_id, recorded })),
        Err(e) => Json(ApiResponse::error(format!("failed to record trade feedback: {e}"))),
    }
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    days: Option<i64>,
}

async fn calibration_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<ApiResponse<TradeStats>> {
    match state.handles.calibrator.stats(query.days.unwrap_or(30)).await {
        Ok(stats) => Json(ApiResponse::success(stats)),
        Err(e) => Json(ApiResponse::error(format!("failed to compute calibration stats: {e}"))),
    }
}

#[derive(Debug, Serialize)]
struct WeightsResponse {
    weights: Weights,
    source: &'static str,
}

async fn calibration_weights(State(state): State<AppState>) -> Json<ApiResponse<WeightsResponse>> {
    let weights = state.handles.calibrator.current_weights().await;
    Json(ApiResponse::success(WeightsResponse { weights, source: "weight-calibrator" }))
}

async fn calibration_run(State(state): State<AppState>) -> Json<ApiResponse<CalibrationOutcome>> {
    match state.handles.calibrator.calibrate().await {
        Ok(outcome) => {
            if let CalibrationOutcome::Completed(result) = &outcome {
                if result.persisted {
                    state.handles.scorer.reload_weights(state.handles.calibrator.current_weights().await).await;
                }
            }
            Json(ApiResponse::success(outcome))
        }
        Err(e) => Json(ApiResponse::error(format!("calibration failed: {e}"))),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/trade-result", post(trade_result))
        .route("/api/calibration/stats", get(calibration_stats))
        .route("/api/calibration/weights", get(calibration_weights))
        .route("/api/calibration/run", post(calibration_run))
}
