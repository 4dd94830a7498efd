//! Macro-data connectors: central-bank and government statistical time series.

use async_trait::async_trait;
use chrono::Utc;
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use http_fetch::FetchClient;
use std::sync::Arc;

use crate::PollBookkeeping;

/// One FRED series tracked by the macro connector, with the threshold used to decide
/// whether the latest-vs-prior delta is worth a signal.
pub struct FredSeries {
    pub series_id: &'static str,
    pub label: &'static str,
    /// minimum absolute % change (prior to latest) that triggers a signal
    pub threshold_pct: f64,
    /// true if a rising value is bearish (e.g. jobless claims, HY spread)
    pub rising_is_bearish: bool,
}

pub fn tracked_series() -> Vec<FredSeries> {
    vec![
        FredSeries {
            series_id: "ICSA",
            label: "Initial jobless claims",
            threshold_pct: 8.0,
            rising_is_bearish: true,
        },
        FredSeries {
            series_id: "JTSJOL",
            label: "Job openings (JOLTS)",
            threshold_pct: 5.0,
            rising_is_bearish: false,
        },
        FredSeries {
            series_id: "CPIAUCSL",
            label: "CPI",
            threshold_pct: 0.5,
            rising_is_bearish: true,
        },
        FredSeries {
            series_id: "DFF",
            label: "Effective Fed funds rate",
            threshold_pct: 0.1,
            rising_is_bearish: true,
        },
        FredSeries {
            series_id: "T10Y2Y",
            label: "10Y-2Y yield curve",
            threshold_pct: 15.0,
            rising_is_bearish: false,
        },
        FredSeries {
            series_id: "BAMLH0A0HYM2",
            label: "High-yield OAS spread",
            threshold_pct: 5.0,
            rising_is_bearish: true,
        },
    ]
}

/// Polls a fixed set of FRED series and emits a signal when the latest-vs-prior
/// observation moves more than that series' threshold.
pub struct FredConnector {
    api_key: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl FredConnector {
    pub fn new(api_key: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            api_key: api_key.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }

    async fn poll_series(&self, series: &FredSeries) -> Option<Signal> {
        let body = self
            .fetch
            .get_json(
                "https://api.stlouisfed.org/fred/series/observations",
                &[
                    ("series_id", series.series_id),
                    ("api_key", self.api_key.as_str()),
                    ("file_type", "json"),
                    ("sort_order", "desc"),
                    ("limit", "2"),
                ],
            )
            .await?;

        let obs = body.get("observations")?.as_array()?;
        if obs.len() < 2 {
            return None;
        }
        let latest: f64 = obs[0].get("value")?.as_str()?.parse().ok()?;
        let prior: f64 = obs[1].get("value")?.as_str()?.parse().ok()?;
        if prior.abs() < f64::EPSILON {
            return None;
        }
        let pct_change = ((latest - prior) / prior.abs()) * 100.0;
        if pct_change.abs() < series.threshold_pct {
            return None;
        }

        let rose = pct_change > 0.0;
        let bearish = rose == series.rising_is_bearish;
        let strength = (pct_change.abs() / (series.threshold_pct * 3.0)).min(1.0);

        Some(Signal {
            id: Signal::stable_id(
                "fred",
                &[series.series_id, &Utc::now().format("%Y-%m-%d").to_string()],
            ),
            name: format!("{} surprise", series.label),
            source: "fred_series".to_string(),
            category: SignalCategory::Macro,
            priority: if strength > 0.6 {
                SignalPriority::High
            } else {
                SignalPriority::Medium
            },
            direction: if bearish { -strength } else { strength },
            strength,
            description: format!(
                "{} moved {:.2}% ({:.2} -> {:.2})",
                series.label, pct_change, prior, latest
            ),
            affected_symbols: vec!["SPY".to_string()],
            trade_hints: vec![],
            raw_data: [
                ("latest".to_string(), serde_json::json!(latest)),
                ("prior".to_string(), serde_json::json!(prior)),
            ]
            .into_iter()
            .collect(),
            detected_at: Utc::now(),
            ttl_hours: 24.0,
            reliability: 0.8,
        })
    }
}

#[async_trait]
impl Connector for FredConnector {
    fn name(&self) -> &str {
        "fred_series"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Macro
    }
    fn poll_interval_minutes(&self) -> i64 {
        60
    }
    fn reliability(&self) -> f64 {
        0.8
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let mut signals = Vec::new();
        let mut any_ok = false;
        for series in tracked_series() {
            if let Some(sig) = self.poll_series(&series).await {
                signals.push(sig);
            }
            any_ok = true;
        }
        if any_ok {
            self.bookkeeping.record_success();
        } else {
            self.bookkeeping.record_failure();
        }
        signals
    }
}
