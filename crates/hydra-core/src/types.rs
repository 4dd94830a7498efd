use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Broad category a Signal belongs to, used for summary grouping and store filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Crypto,
    Metals,
    Macro,
    Equities,
    Options,
    Rates,
    Fx,
    Geopolitical,
    AiDisruption,
    Structural,
}

/// Priority ordering used by `SignalStore::active` (CRITICAL < HIGH < MEDIUM < LOW).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// A typed observation produced by a Connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub name: String,
    pub source: String,
    pub category: SignalCategory,
    pub priority: SignalPriority,
    /// -1.0 (bearish) to 1.0 (bullish)
    pub direction: f64,
    /// 0.0 to 1.0
    pub strength: f64,
    pub description: String,
    pub affected_symbols: Vec<String>,
    pub trade_hints: Vec<String>,
    pub raw_data: HashMap<String, serde_json::Value>,
    pub detected_at: DateTime<Utc>,
    pub ttl_hours: f64,
    /// 0.0 to 1.0, fixed per-connector reliability used to compute `composite`.
    pub reliability: f64,
}

impl Signal {
    /// Stable id derived from the source and the logical-event fields the caller supplies,
    /// so repeated polls of the same underlying event dedupe in the store.
    pub fn stable_id(source: &str, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        for p in parts {
            hasher.update(b"|");
            hasher.update(p.as_bytes());
        }
        hex::encode(hasher.finalize())[..16].to_string()
    }

    pub fn composite(&self) -> f64 {
        self.direction * self.strength * self.reliability
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::milliseconds((self.ttl_hours * 3_600_000.0) as i64);
        now > self.detected_at + ttl
    }
}

/// Per-connector mutable state tracked by the connector framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorState {
    pub name: String,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub poll_interval_minutes: i64,
    pub error_count: u32,
    pub reliability: f64,
}

impl ConnectorState {
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_poll_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::minutes(self.poll_interval_minutes),
        }
    }

    /// Healthy while `error_count < 3`, per the connector framework's error discipline.
    pub fn is_healthy(&self) -> bool {
        self.error_count < 3
    }
}

/// One of the eight blowup-scorer inputs at a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
    pub source: String,
    pub healthy: bool,
    pub details: HashMap<String, serde_json::Value>,
}

impl ComponentScore {
    /// A placeholder used when a fetcher fails: `raw=0, healthy=false`, never absent.
    pub fn degraded(name: &str, weight: f64) -> Self {
        ComponentScore {
            name: name.to_string(),
            raw: 0.0,
            weight,
            weighted: 0.0,
            source: "unavailable".to_string(),
            healthy: false,
            details: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    RiskOn,
    RiskOff,
    Transition,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    NoTrade,
    ScalpOnly,
    Straddle,
    DirectionalCall,
    DirectionalPut,
}

/// One scorer tick. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlowupResult {
    pub probability: u8,
    pub direction: Direction,
    pub regime: Regime,
    /// fraction of healthy components, 0.0 to 1.0
    pub confidence: f64,
    pub triggers: Vec<String>,
    pub recommendation: Recommendation,
    pub events_next_30min: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub components: Vec<ComponentScore>,
}

/// The scorer's weight map. Always sums to 1.0 (within floating tolerance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    pub values: HashMap<String, f64>,
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Renormalize so weights sum to 1.0, preserving keys with a zero incoming value.
    pub fn renormalized(mut self) -> Self {
        let total = self.sum();
        if total > f64::EPSILON {
            for v in self.values.values_mut() {
                *v /= total;
            }
        }
        self
    }
}

/// Default component weights, mirroring the scorer's factory defaults.
pub fn default_weights() -> Weights {
    let values = [
        ("vix_inversion", 0.20),
        ("flow_imbalance", 0.20),
        ("crypto_cascade", 0.10),
        ("premarket_gap", 0.10),
        ("event_proximity", 0.15),
        ("cross_asset", 0.10),
        ("volume_surge", 0.10),
        ("breadth", 0.05),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    Weights { values }
}

/// A day's market-conditions snapshot, used for nearest-neighbor historical matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub date: chrono::NaiveDate,
    pub gex_regime: String,
    pub flow_bias: String,
    pub dark_pool_bias: String,
    pub vix: f64,
    pub spy_change_pct: f64,
    pub spy_range_pct: f64,
    pub blowup_score: u8,
    /// next-day SPY % change, set once known
    pub outcome: Option<f64>,
    pub embedding: Option<Vec<f32>>,
}

impl Fingerprint {
    /// Textual form fed to an embedding model.
    pub fn to_text(&self) -> String {
        format!(
            "gex={} flow={} darkpool={} vix={:.1} spy_chg={:.2}% spy_range={:.2}% blowup={}",
            self.gex_regime,
            self.flow_bias,
            self.dark_pool_bias,
            self.vix,
            self.spy_change_pct,
            self.spy_range_pct,
            self.blowup_score
        )
    }
}

/// Outcome record posted back for a completed trade, used by the calibrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeFeedback {
    pub trade_id: String,
    pub ticker: String,
    pub direction: String,
    pub mode: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub pnl_pct: Option<f64>,
    pub conviction: Option<i32>,
    pub entry_blowup_score: Option<u8>,
    pub entry_direction: Option<Direction>,
    pub entry_triggers: Vec<String>,
    pub entry_regime: Option<Regime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signal() -> Signal {
        Signal {
            id: Signal::stable_id("vix_monitor", &["CBOE", "VIX"]),
            name: "VIX spike".to_string(),
            source: "vix_monitor".to_string(),
            category: SignalCategory::Macro,
            priority: SignalPriority::High,
            direction: -0.8,
            strength: 0.6,
            description: "VIX up sharply".to_string(),
            affected_symbols: vec!["SPY".to_string()],
            trade_hints: vec![],
            raw_data: HashMap::new(),
            detected_at: Utc::now(),
            ttl_hours: 4.0,
            reliability: 0.9,
        }
    }

    #[test]
    fn stable_id_is_deterministic() {
        let a = Signal::stable_id("vix_monitor", &["CBOE", "VIX"]);
        let b = Signal::stable_id("vix_monitor", &["CBOE", "VIX"]);
        assert_eq!(a, b);
        let c = Signal::stable_id("vix_monitor", &["CBOE", "VIX9D"]);
        assert_ne!(a, c);
    }

    #[test]
    fn composite_multiplies_direction_strength_reliability() {
        let s = sample_signal();
        assert!((s.composite() - (-0.8 * 0.6 * 0.9)).abs() < 1e-9);
    }

    #[test]
    fn signal_expires_after_ttl() {
        let s = sample_signal();
        assert!(!s.is_expired(s.detected_at));
        assert!(s.is_expired(s.detected_at + chrono::Duration::hours(5)));
        assert!(!s.is_expired(s.detected_at + chrono::Duration::hours(3)));
    }

    #[test]
    fn connector_state_due_and_healthy() {
        let mut st = ConnectorState {
            name: "vix".to_string(),
            last_poll_at: None,
            poll_interval_minutes: 5,
            error_count: 0,
            reliability: 0.9,
        };
        let now = Utc::now();
        assert!(st.due(now));
        st.last_poll_at = Some(now);
        assert!(!st.due(now + chrono::Duration::minutes(2)));
        assert!(st.due(now + chrono::Duration::minutes(6)));
        st.error_count = 3;
        assert!(!st.is_healthy());
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = default_weights();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert_eq!(w.values.len(), 8);
    }

    #[test]
    fn weights_renormalize_preserves_keys() {
        let mut values = HashMap::new();
        values.insert("vix_inversion".to_string(), 0.8);
        values.insert("breadth".to_string(), 0.0);
        let w = Weights { values }.renormalized();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert!(w.values.contains_key("breadth"));
        assert_eq!(w.get("breadth"), 0.0);
    }

    #[test]
    fn priority_orders_critical_first() {
        let mut ps = vec![
            SignalPriority::Low,
            SignalPriority::Critical,
            SignalPriority::Medium,
            SignalPriority::High,
        ];
        ps.sort();
        assert_eq!(
            ps,
            vec![
                SignalPriority::Critical,
                SignalPriority::High,
                SignalPriority::Medium,
                SignalPriority::Low,
            ]
        );
    }
}
