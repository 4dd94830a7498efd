use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_PREMIUM_SWEEP: f64 = 50_000.0;
pub const SWEEP_CONDITIONS: [u32; 2] = [12, 37];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargestTrade {
    pub trade_type: String,
    pub premium: f64,
    pub ticker: String,
    pub size: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstitutionalBias {
    AggressivelyBullish,
    ModeratelyBullish,
    Neutral,
    ModeratelyBearish,
    AggressivelyBearish,
}

impl InstitutionalBias {
    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::AggressivelyBullish | Self::ModeratelyBullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Self::AggressivelyBearish | Self::ModeratelyBearish)
    }

    pub fn is_aggressive(&self) -> bool {
        matches!(self, Self::AggressivelyBullish | Self::AggressivelyBearish)
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "AGGRESSIVELY_BULLISH" => Self::AggressivelyBullish,
            "MODERATELY_BULLISH" => Self::ModeratelyBullish,
            "MODERATELY_BEARISH" => Self::ModeratelyBearish,
            "AGGRESSIVELY_BEARISH" => Self::AggressivelyBearish,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub net_premium_calls: f64,
    pub net_premium_puts: f64,
    pub premium_ratio: f64,
    pub sweep_count_calls: u32,
    pub sweep_count_puts: u32,
    pub largest_trade: Option<LargestTrade>,
    pub institutional_bias: InstitutionalBias,
    pub confidence: f64,
    pub total_trades_analyzed: usize,
    pub haiku_analysis: String,
    pub latency_ms: f64,
}

impl FlowSnapshot {
    pub fn empty(now: DateTime<Utc>, ticker: &str) -> Self {
        Self {
            timestamp: now,
            ticker: ticker.to_string(),
            net_premium_calls: 0.0,
            net_premium_puts: 0.0,
            premium_ratio: 1.0,
            sweep_count_calls: 0,
            sweep_count_puts: 0,
            largest_trade: None,
            institutional_bias: InstitutionalBias::Neutral,
            confidence: 50.0,
            total_trades_analyzed: 0,
            haiku_analysis: "no options trades fetched".to_string(),
            latency_ms: 0.0,
        }
    }
}

pub struct AggregatedFlow {
    pub call_premium: f64,
    pub put_premium: f64,
    pub call_sweeps: u32,
    pub put_sweeps: u32,
    pub largest_trade: Option<LargestTrade>,
    pub total_trades: usize,
}

pub struct Classification {
    pub bias: InstitutionalBias,
    pub confidence: f64,
    pub reasoning: String,
    pub latency_ms: f64,
}
