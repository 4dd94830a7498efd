use chrono::{DateTime, Utc};
use hydra_core::Fingerprint;
use serde::{Deserialize, Serialize};

pub const TOP_K_CANDIDATES: usize = 5;
pub const HISTORY_DAYS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceMatch {
    pub date: chrono::NaiveDate,
    pub similarity: f64,
    pub conditions: Fingerprint,
    pub outcome: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    pub timestamp: DateTime<Utc>,
    pub current_conditions: Fingerprint,
    pub similar_sequences: Vec<SequenceMatch>,
    pub predicted_direction: String,
    pub historical_win_rate: f64,
    pub average_outcome: f64,
    pub nova_analysis: String,
    pub confidence: i32,
    pub latency_ms: f64,
}

impl SequenceAnalysis {
    pub fn no_match(now: DateTime<Utc>, current_conditions: Fingerprint) -> Self {
        Self {
            timestamp: now,
            current_conditions,
            similar_sequences: vec![],
            predicted_direction: "NEUTRAL".to_string(),
            historical_win_rate: 0.5,
            average_outcome: 0.0,
            nova_analysis: "No similar sequences found".to_string(),
            confidence: 0,
            latency_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvictionModifier {
    pub modifier: i32,
    pub reasons: Vec<String>,
    pub similar_sequences: usize,
    pub avg_outcome: f64,
}

impl ConvictionModifier {
    pub fn none() -> Self {
        Self { modifier: 0, reasons: vec!["no historical pattern match".to_string()], similar_sequences: 0, avg_outcome: 0.0 }
    }
}
