use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_BLOCK_SIZE: f64 = 10_000.0;
pub const MIN_NOTIONAL: f64 = 500_000.0;
pub const PRICE_CLUSTER_SIZE: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelStrength {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl LevelStrength {
    pub fn is_strong(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DarkPoolLevel {
    pub price: f64,
    pub volume: f64,
    pub notional: f64,
    pub trade_count: u32,
    pub side: Side,
    pub strength: LevelStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DarkPoolSnapshot {
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub spot_price: f64,
    pub levels: Vec<DarkPoolLevel>,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    pub support_strength: Option<LevelStrength>,
    pub resistance_strength: Option<LevelStrength>,
    pub total_dark_volume: f64,
    pub total_dark_notional: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
}

impl DarkPoolSnapshot {
    pub fn empty(now: DateTime<Utc>, ticker: &str) -> Self {
        Self {
            timestamp: now,
            ticker: ticker.to_string(),
            spot_price: 0.0,
            levels: vec![],
            nearest_support: None,
            nearest_resistance: None,
            support_strength: None,
            resistance_strength: None,
            total_dark_volume: 0.0,
            total_dark_notional: 0.0,
            buy_volume: 0.0,
            sell_volume: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockTrade {
    pub price: f64,
    pub size: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Nbbo {
    pub bid: f64,
    pub ask: f64,
}
