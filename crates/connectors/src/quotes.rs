//! Market-quote lookup connectors: daily-close based monitors (VIX, SKEW, DXY,
//! credit-spread ETF pair). Each polls a quote provider for the last two daily
//! closes and thresholds on the % change.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use http_fetch::FetchClient;
use std::sync::Arc;

use crate::bookkeeping::PollBookkeeping;

/// Fetches the last two daily closes for a symbol from Polygon's aggregates endpoint.
async fn last_two_closes(fetch: &FetchClient, symbol: &str, api_key: &str) -> Option<(f64, f64)> {
    let to = Utc::now();
    let from = to - Duration::days(10);
    let url = format!(
        "https://api.polygon.io/v2/aggs/ticker/{symbol}/range/1/day/{}/{}",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    );
    let body = fetch
        .get_json(&url, &[("apiKey", api_key), ("sort", "desc"), ("limit", "2")])
        .await?;
    let results = body.get("results")?.as_array()?;
    if results.len() < 2 {
        return None;
    }
    let latest = results[0].get("c")?.as_f64()?;
    let prior = results[1].get("c")?.as_f64()?;
    Some((latest, prior))
}

/// CBOE VIX monitor. Feeds the blowup scorer's `vix_inversion` fetcher but also emits
/// a standalone signal on sharp single-day spikes.
pub struct CboeVixMonitor {
    api_key: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl CboeVixMonitor {
    pub fn new(api_key: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            api_key: api_key.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for CboeVixMonitor {
    fn name(&self) -> &str {
        "cboe_vix"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Equities
    }
    fn poll_interval_minutes(&self) -> i64 {
        5
    }
    fn reliability(&self) -> f64 {
        0.95
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let Some((latest, prior)) = last_two_closes(&self.fetch, "I:VIX", &self.api_key).await else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        if latest < 25.0 {
            return Vec::new();
        }
        let pct_change = (latest - prior) / prior.max(1.0) * 100.0;
        let strength = ((latest - 20.0) / 20.0).clamp(0.0, 1.0);
        vec![Signal {
            id: Signal::stable_id("cboe_vix", &[&Utc::now().format("%Y-%m-%d").to_string()]),
            name: "VIX elevated".to_string(),
            source: "cboe_vix".to_string(),
            category: SignalCategory::Equities,
            priority: if latest > 30.0 {
                SignalPriority::High
            } else {
                SignalPriority::Medium
            },
            direction: -1.0,
            strength,
            description: format!("VIX {latest:.1} ({pct_change:+.1}% day over day)"),
            affected_symbols: vec!["SPY".to_string()],
            trade_hints: vec![],
            raw_data: [
                ("vix_close".to_string(), serde_json::json!(latest)),
                ("vix_change_pct".to_string(), serde_json::json!(pct_change)),
            ]
            .into_iter()
            .collect(),
            detected_at: Utc::now(),
            ttl_hours: 6.0,
            reliability: self.reliability(),
        }]
    }
}

/// CBOE SKEW index monitor. Elevated SKEW signals heavy tail-risk hedging demand.
pub struct SkewIndexMonitor {
    api_key: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl SkewIndexMonitor {
    pub fn new(api_key: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            api_key: api_key.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for SkewIndexMonitor {
    fn name(&self) -> &str {
        "skew_index"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Equities
    }
    fn poll_interval_minutes(&self) -> i64 {
        15
    }
    fn reliability(&self) -> f64 {
        0.7
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let Some((latest, _prior)) = last_two_closes(&self.fetch, "I:SKEW", &self.api_key).await else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        if latest < 145.0 {
            return Vec::new();
        }
        let strength = ((latest - 140.0) / 30.0).clamp(0.0, 1.0);
        vec![Signal {
            id: Signal::stable_id("skew_index", &[&Utc::now().format("%Y-%m-%d").to_string()]),
            name: "SKEW elevated".to_string(),
            source: "skew_index".to_string(),
            category: SignalCategory::Equities,
            priority: SignalPriority::Medium,
            direction: -0.4,
            strength,
            description: format!("SKEW {latest:.1}, elevated tail-risk pricing"),
            affected_symbols: vec!["SPY".to_string()],
            trade_hints: vec![],
            raw_data: std::collections::HashMap::new(),
            detected_at: Utc::now(),
            ttl_hours: 12.0,
            reliability: self.reliability(),
        }]
    }
}

/// Dollar index (DXY) monitor, an input to cross-asset divergence checks.
pub struct DxyMonitor {
    api_key: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl DxyMonitor {
    pub fn new(api_key: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            api_key: api_key.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for DxyMonitor {
    fn name(&self) -> &str {
        "dxy_monitor"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Fx
    }
    fn poll_interval_minutes(&self) -> i64 {
        15
    }
    fn reliability(&self) -> f64 {
        0.75
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let Some((latest, prior)) = last_two_closes(&self.fetch, "I:DXY", &self.api_key).await else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        let pct_change = (latest - prior) / prior.max(1.0) * 100.0;
        if pct_change.abs() < 0.6 {
            return Vec::new();
        }
        let strength = (pct_change.abs() / 1.5).min(1.0);
        vec![Signal {
            id: Signal::stable_id("dxy_monitor", &[&Utc::now().format("%Y-%m-%d").to_string()]),
            name: "Dollar index move".to_string(),
            source: "dxy_monitor".to_string(),
            category: SignalCategory::Fx,
            priority: SignalPriority::Low,
            direction: if pct_change > 0.0 { -0.2 } else { 0.2 },
            strength,
            description: format!("DXY moved {pct_change:+.2}%"),
            affected_symbols: vec!["SPY".to_string(), "GLD".to_string()],
            trade_hints: vec![],
            raw_data: std::collections::HashMap::new(),
            detected_at: Utc::now(),
            ttl_hours: 8.0,
            reliability: self.reliability(),
        }]
    }
}

/// HYG/LQD credit-spread proxy: widening high-yield underperformance vs
/// investment-grade signals credit stress.
pub struct CreditSpreadMonitor {
    api_key: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl CreditSpreadMonitor {
    pub fn new(api_key: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            api_key: api_key.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for CreditSpreadMonitor {
    fn name(&self) -> &str {
        "credit_spread_etfs"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Rates
    }
    fn poll_interval_minutes(&self) -> i64 {
        30
    }
    fn reliability(&self) -> f64 {
        0.65
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let hyg = last_two_closes(&self.fetch, "HYG", &self.api_key).await;
        let lqd = last_two_closes(&self.fetch, "LQD", &self.api_key).await;
        let (Some((hyg_latest, hyg_prior)), Some((lqd_latest, lqd_prior))) = (hyg, lqd) else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        let hyg_pct = (hyg_latest - hyg_prior) / hyg_prior.max(1.0) * 100.0;
        let lqd_pct = (lqd_latest - lqd_prior) / lqd_prior.max(1.0) * 100.0;
        let relative_underperformance = lqd_pct - hyg_pct;
        if relative_underperformance < 0.4 {
            return Vec::new();
        }
        let strength = (relative_underperformance / 1.2).min(1.0);
        vec![Signal {
            id: Signal::stable_id("credit_spread_etfs", &[&Utc::now().format("%Y-%m-%d").to_string()]),
            name: "Credit spread widening".to_string(),
            source: "credit_spread_etfs".to_string(),
            category: SignalCategory::Rates,
            priority: SignalPriority::Medium,
            direction: -0.5,
            strength,
            description: format!(
                "HYG underperformed LQD by {relative_underperformance:.2}pp today"
            ),
            affected_symbols: vec!["HYG".to_string(), "LQD".to_string(), "SPY".to_string()],
            trade_hints: vec![],
            raw_data: std::collections::HashMap::new(),
            detected_at: Utc::now(),
            ttl_hours: 12.0,
            reliability: self.reliability(),
        }]
    }
}
