use chrono::{DateTime, Utc};
use dark_pool_mapper::DarkPoolSnapshot;
use flow_decoder::FlowSnapshot;
use gex_engine::GexSnapshot;
use hydra_core::BlowupResult;
use sequence_matcher::SequenceAnalysis;
use serde::{Deserialize, Serialize};

/// The aggregator's single always-answerable view, combining the latest scorer
/// tick with the latest snapshot from each auxiliary subsystem. Any subsystem
/// whose snapshot is absent is substituted with its documented default rather
/// than omitted, so `snapshot()` never needs its caller to branch on presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub blowup: Option<BlowupResult>,
    pub gamma: GexSnapshot,
    pub flow: FlowSnapshot,
    pub dark_pool: DarkPoolSnapshot,
    pub sequence: Option<SequenceAnalysis>,
}

impl IntelligenceSnapshot {
    /// The defined-defaults shape required when every subsystem is absent
    /// (Invariant 12 / Scenario-style "never crash, never error" contract).
    pub fn defaults(now: DateTime<Utc>, ticker: &str) -> Self {
        Self {
            timestamp: now,
            blowup: None,
            gamma: GexSnapshot::empty(now),
            flow: FlowSnapshot::empty(now, ticker),
            dark_pool: DarkPoolSnapshot::empty(now, ticker),
            sequence: None,
        }
    }
}

/// A single composed `conviction()` result: an integer modifier in roughly
/// [-40, +40] plus the individual subrule contributions and their reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvictionBreakdown {
    pub total_modifier: i32,
    pub gamma_modifier: i32,
    pub flow_modifier: i32,
    pub dark_pool_modifier: i32,
    pub sequence_modifier: i32,
    pub reasons: Vec<String>,
}

impl ConvictionBreakdown {
    pub fn none() -> Self {
        Self {
            total_modifier: 0,
            gamma_modifier: 0,
            flow_modifier: 0,
            dark_pool_modifier: 0,
            sequence_modifier: 0,
            reasons: vec![],
        }
    }
}
