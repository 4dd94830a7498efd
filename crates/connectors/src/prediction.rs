//! Prediction-market odds connector. Carries the raw probability rather than
//! deriving a direction — callers interpret it in context.

use async_trait::async_trait;
use chrono::Utc;
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use http_fetch::FetchClient;
use std::sync::Arc;

use crate::bookkeeping::PollBookkeeping;

pub struct PolymarketMonitor {
    keyword: String,
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl PolymarketMonitor {
    pub fn new(keyword: impl Into<String>, fetch: Arc<FetchClient>) -> Self {
        Self {
            keyword: keyword.into(),
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for PolymarketMonitor {
    fn name(&self) -> &str {
        "polymarket_odds"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Structural
    }
    fn poll_interval_minutes(&self) -> i64 {
        15
    }
    fn reliability(&self) -> f64 {
        0.5
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let Some(body) = self
            .fetch
            .get_json(
                "https://gamma-api.polymarket.com/markets",
                &[("active", "true"), ("search", self.keyword.as_str())],
            )
            .await
        else {
            self.bookkeeping.record_failure();
            return Vec::new();
        };
        self.bookkeeping.record_success();

        let Some(markets) = body.as_array() else {
            return Vec::new();
        };
        markets
            .iter()
            .filter_map(|m| {
                let question = m.get("question")?.as_str()?;
                let prob = m.get("lastTradePrice")?.as_f64()?;
                Some(Signal {
                    id: Signal::stable_id("polymarket_odds", &[question]),
                    name: question.to_string(),
                    source: "polymarket_odds".to_string(),
                    category: SignalCategory::Structural,
                    priority: SignalPriority::Low,
                    direction: 0.0,
                    strength: 0.1,
                    description: format!("{question}: {:.0}% implied", prob * 100.0),
                    affected_symbols: vec![],
                    trade_hints: vec![],
                    raw_data: [("probability".to_string(), serde_json::json!(prob))]
                        .into_iter()
                        .collect(),
                    detected_at: Utc::now(),
                    ttl_hours: 6.0,
                    reliability: self.reliability(),
                })
            })
            .collect()
    }
}
