use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-trigger precision/recall/F1 derived from feedback rows mentioning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerStats {
    pub trigger: String,
    pub wins: u32,
    pub total: u32,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub avg_pnl_pct: f64,
}

/// Structured result of one `calibrate()` invocation. Always returned on the
/// success path, whether or not new weights were actually persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub old_weights: HashMap<String, f64>,
    pub new_weights: HashMap<String, f64>,
    pub per_trigger: Vec<TriggerStats>,
    pub direction_accuracy: f64,
    pub overall_precision: f64,
    pub overall_recall: f64,
    pub weight_delta: f64,
    pub persisted: bool,
    pub notes: String,
}

/// `calibrate()`'s outcome: either it ran (possibly without persisting, if the
/// weight delta was below the persistence threshold) or its precondition
/// (>= 20 BLOWUP-mode feedback rows) wasn't met.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationOutcome {
    Skipped { reason: String },
    Completed(CalibrationResult),
}

/// Plain win-rate/PnL statistics over recorded feedback, for `/api/calibration/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub avg_pnl_pct: f64,
    pub days: i64,
}
