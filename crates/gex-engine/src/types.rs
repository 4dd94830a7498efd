use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GexRegime {
    Positive,
    Negative,
    Neutral,
    Unknown,
}

/// One same-day-expiry option contract with the greeks needed for dealer
/// hedging-flow estimation.
#[derive(Debug, Clone, Copy)]
pub struct OptionQuote {
    pub strike: f64,
    pub is_call: bool,
    pub open_interest: f64,
    pub iv: f64,
    pub gamma: f64,
    pub vega: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexSnapshot {
    pub timestamp: DateTime<Utc>,
    pub spot_price: f64,
    pub total_gex: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub flip_point: Option<f64>,
    pub flip_distance_pct: f64,
    pub regime: GexRegime,
    pub charm_flow_per_hour: f64,
    pub vanna_exposure: f64,
    pub key_support: Vec<f64>,
    pub key_resistance: Vec<f64>,
    pub magnets: Vec<f64>,
    pub refresh_interval_seconds: u32,
    pub options_count: usize,
}

impl GexSnapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        GexSnapshot {
            timestamp: now,
            spot_price: 0.0,
            total_gex: 0.0,
            call_gex: 0.0,
            put_gex: 0.0,
            flip_point: None,
            flip_distance_pct: 1.0,
            regime: GexRegime::Unknown,
            charm_flow_per_hour: 0.0,
            vanna_exposure: 0.0,
            key_support: vec![],
            key_resistance: vec![],
            magnets: vec![],
            refresh_interval_seconds: 300,
            options_count: 0,
        }
    }
}
