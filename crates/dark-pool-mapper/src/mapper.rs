use chrono::Utc;
use http_fetch::FetchClient;
use serde_json::Value;

use crate::history::HistoryStore;
use crate::math::{cluster_levels, find_support_resistance};
use crate::types::{BlockTrade, DarkPoolSnapshot, LevelStrength, Nbbo, MIN_BLOCK_SIZE, MIN_NOTIONAL};

pub struct DarkPoolMapper {
    client: FetchClient,
    history: Option<HistoryStore>,
}

impl DarkPoolMapper {
    pub fn new(client: FetchClient, history: Option<HistoryStore>) -> Self {
        Self { client, history }
    }

    /// Pulls recent trades + NBBO + spot from Polygon, filters for dark-pool
    /// block prints (exchange 4 with a TRF id, 10K+ shares, $500K+ notional),
    /// and clusters them into support/resistance levels. Degrades to an
    /// empty, level-less snapshot without an API key or any qualifying blocks.
    pub async fn calculate(&self, ticker: &str) -> DarkPoolSnapshot {
        let now = Utc::now();

        let Ok(api_key) = std::env::var("POLYGON_API_KEY") else {
            return DarkPoolSnapshot::empty(now, ticker);
        };
        if api_key.is_empty() {
            return DarkPoolSnapshot::empty(now, ticker);
        }

        let trades = self.fetch_trades(ticker, &api_key).await;
        let nbbo = self.fetch_nbbo(ticker, &api_key).await;
        let mut spot = self.fetch_spot(ticker, &api_key).await;
        if spot <= 0.0 && nbbo.bid > 0.0 {
            spot = (nbbo.bid + nbbo.ask) / 2.0;
        }

        let blocks = filter_block_trades(&trades);
        if blocks.is_empty() {
            return DarkPoolSnapshot::empty(now, ticker);
        }

        let (mut levels, total_volume, total_notional, buy_volume, sell_volume) = cluster_levels(&blocks, nbbo);
        levels.truncate(20);

        let (support, resistance) = find_support_resistance(&levels, spot);
        let nearest_support = support.map(|l| l.price);
        let nearest_resistance = resistance.map(|l| l.price);
        let support_strength = support.map(|l| l.strength);
        let resistance_strength = resistance.map(|l| l.strength);

        let snapshot = DarkPoolSnapshot {
            timestamp: now,
            ticker: ticker.to_string(),
            spot_price: (spot * 100.0).round() / 100.0,
            levels,
            nearest_support,
            nearest_resistance,
            support_strength,
            resistance_strength,
            total_dark_volume: total_volume,
            total_dark_notional: total_notional.round(),
            buy_volume,
            sell_volume,
        };

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&snapshot).await {
                tracing::warn!(error = %e, "failed to persist dark pool levels");
            }
        }

        snapshot
    }

    async fn fetch_trades(&self, ticker: &str, api_key: &str) -> Vec<Value> {
        let url = format!("https://api.polygon.io/v3/trades/{ticker}");
        self.client
            .get_json(&url, &[("apiKey", api_key), ("limit", "5000"), ("order", "desc"), ("sort", "timestamp")])
            .await
            .and_then(|body| body.get("results").and_then(|r| r.as_array()).cloned())
            .unwrap_or_default()
    }

    async fn fetch_nbbo(&self, ticker: &str, api_key: &str) -> Nbbo {
        let url = format!("https://api.polygon.io/v3/quotes/{ticker}");
        let Some(body) = self.client.get_json(&url, &[("apiKey", api_key), ("limit", "1"), ("order", "desc")]).await else {
            return Nbbo::default();
        };

        body.get("results")
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .map(|row| Nbbo {
                bid: row.get("bid_price").and_then(|v| v.as_f64()).unwrap_or(0.0),
                ask: row.get("ask_price").and_then(|v| v.as_f64()).unwrap_or(0.0),
            })
            .unwrap_or_default()
    }

    async fn fetch_spot(&self, ticker: &str, api_key: &str) -> f64 {
        let url = format!("https://api.polygon.io/v2/aggs/ticker/{ticker}/prev");
        let Some(body) = self.client.get_json(&url, &[("apiKey", api_key)]).await else {
            return 0.0;
        };

        body.get("results")
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .and_then(|row| row.get("c"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Conviction modifier from dark-pool support/resistance placement and
    /// overall buy/sell flow skew, §4.10.
    pub fn conviction_modifier(snapshot: &DarkPoolSnapshot, entry_price: f64, stop_price: f64, target_price: f64) -> (i32, Vec<String>) {
        let mut modifier = 0;
        let mut reasons = Vec::new();

        if let Some(support) = snapshot.nearest_support {
            if stop_price < support && support < entry_price {
                if snapshot.support_strength.map(|s| s.is_strong()).unwrap_or(false) {
                    modifier += 10;
                    reasons.push(format!("strong dark-pool support at ${:.2} above stop", support));
                } else {
                    modifier += 5;
                    reasons.push(format!("dark-pool support at ${:.2}", support));
                }
            }
        }

        if let Some(resistance) = snapshot.nearest_resistance {
            if entry_price < resistance && resistance < target_price {
                if snapshot.resistance_strength.map(|s| s.is_strong()).unwrap_or(false) {
                    modifier -= 10;
                    reasons.push(format!("strong dark-pool resistance at ${:.2} before target", resistance));
                } else {
                    modifier -= 5;
                    reasons.push(format!("dark-pool resistance at ${:.2}", resistance));
                }
            }
        }

        if snapshot.buy_volume > snapshot.sell_volume * 2.0 {
            modifier += 5;
            reasons.push("dark pool flow heavily buying".to_string());
        } else if snapshot.sell_volume > snapshot.buy_volume * 2.0 {
            modifier -= 5;
            reasons.push("dark pool flow heavily selling".to_string());
        }

        (modifier, reasons)
    }
}

fn is_dark_pool_trade(trade: &Value) -> bool {
    trade.get("exchange").and_then(|v| v.as_i64()) == Some(4) && trade.get("trf_id").is_some()
}

fn filter_block_trades(trades: &[Value]) -> Vec<BlockTrade> {
    trades
        .iter()
        .filter(|t| is_dark_pool_trade(t))
        .filter_map(|trade| {
            let size = trade.get("size").and_then(|v| v.as_f64())?;
            let price = trade.get("price").and_then(|v| v.as_f64())?;
            if size < MIN_BLOCK_SIZE {
                return None;
            }
            let notional = size * price;
            if notional < MIN_NOTIONAL {
                return None;
            }
            Some(BlockTrade { price, size, notional })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn no_api_key_yields_empty_snapshot() {
        std::env::remove_var("POLYGON_API_KEY");
        let mapper = DarkPoolMapper::new(FetchClient::new(Duration::from_secs(2)), None);
        let snapshot = mapper.calculate("SPY").await;
        assert!(snapshot.levels.is_empty());
        assert_eq!(snapshot.total_dark_volume, 0.0);
    }

    #[test]
    fn conviction_rewards_strong_support_above_stop() {
        let snapshot = DarkPoolSnapshot {
            nearest_support: Some(445.0),
            support_strength: Some(LevelStrength::High),
            ..DarkPoolSnapshot::empty(Utc::now(), "SPY")
        };
        let (modifier, reasons) = DarkPoolMapper::conviction_modifier(&snapshot, 450.0, 440.0, 460.0);
        assert_eq!(modifier, 10);
        assert_eq!(reasons.len(), 1);
    }

    #[test]
    fn filters_trades_below_minimum_notional() {
        let trades = vec![serde_json::json!({"exchange": 4, "trf_id": 1, "size": 100, "price": 10.0})];
        assert!(filter_block_trades(&trades).is_empty());
    }

    #[test]
    fn flow_skew_alone_sets_modifier() {
        let snapshot = DarkPoolSnapshot { buy_volume: 1000.0, sell_volume: 100.0, ..DarkPoolSnapshot::empty(Utc::now(), "SPY") };
        let (modifier, _) = DarkPoolMapper::conviction_modifier(&snapshot, 450.0, 440.0, 460.0);
        assert_eq!(modifier, 5);
    }
}
