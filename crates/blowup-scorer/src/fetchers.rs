//! The eight component fetchers that feed the scorer. Each normalizes its input
//! to a `[0,1]` raw score and never raises — a missing API key or failed request
//! yields `healthy=false, raw=0`, same as every other degraded-on-failure path
//! in this workspace.

use chrono::{DateTime, Utc};
use hydra_core::ComponentScore;
use http_fetch::FetchClient;
use serde_json::json;
use std::collections::VecDeque;
use tokio::sync::Mutex;

const POLYGON_BASE: &str = "https://api.polygon.io/v2/aggs/ticker";

fn api_key() -> Option<String> {
    std::env::var("POLYGON_API_KEY").ok().filter(|k| !k.is_empty())
}

async fn prev_day(client: &FetchClient, ticker: &str, key: &str) -> Option<serde_json::Value> {
    let url = format!("{POLYGON_BASE}/{ticker}/prev");
    let body = client.get_json(&url, &[("apiKey", key)]).await?;
    body.get("results")?.get(0).cloned()
}

fn f(v: &serde_json::Value, field: &str, default: f64) -> f64 {
    v.get(field).and_then(|x| x.as_f64()).unwrap_or(default)
}

pub struct VixInversion;

impl VixInversion {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("vix_inversion");
        };
        let Some(vix_data) = prev_day(client, "I:VIX", &key).await else {
            return ComponentScore {
                name: "vix_inversion".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: false,
                details: [("error".to_string(), json!("no VIX data"))].into(),
            };
        };

        let vix_open = f(&vix_data, "o", 20.0);
        let vix_close = f(&vix_data, "c", 20.0);
        let vix_high = f(&vix_data, "h", 20.0);
        let vix_change = if vix_open > 0.0 { (vix_close - vix_open) / vix_open } else { 0.0 };

        let mut score: f64 = if vix_close > 35.0 {
            1.0
        } else if vix_close > 30.0 {
            0.8
        } else if vix_close > 25.0 {
            0.5
        } else if vix_close > 22.0 {
            0.3
        } else if vix_close > 20.0 {
            0.15
        } else {
            0.0
        };

        if vix_change > 0.10 {
            score = (score + 0.3).min(1.0);
        } else if vix_change > 0.05 {
            score = (score + 0.15).min(1.0);
        }

        let details = [
            ("vix_close".to_string(), json!((vix_close * 100.0).round() / 100.0)),
            ("vix_open".to_string(), json!((vix_open * 100.0).round() / 100.0)),
            ("vix_high".to_string(), json!((vix_high * 100.0).round() / 100.0)),
            ("vix_change_pct".to_string(), json!((vix_change * 10000.0).round() / 100.0)),
        ]
        .into();

        ComponentScore {
            name: "vix_inversion".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy: true,
            details,
        }
    }
}

pub struct FlowImbalance;

impl FlowImbalance {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("flow_imbalance");
        };

        let spy = prev_day(client, "SPY", &key).await;
        let volume = spy.as_ref().map(|r| f(r, "v", 0.0)).unwrap_or(0.0);
        let avg_volume = 80_000_000.0_f64;
        let vol_ratio = if avg_volume > 0.0 { volume / avg_volume } else { 1.0 };

        let vix_data = prev_day(client, "I:VIX", &key).await;
        let vix = vix_data.as_ref().map(|r| f(r, "c", 20.0)).unwrap_or(20.0);

        let mut score = 0.0_f64;
        let mut direction_hint = "neutral";

        if vix > 25.0 && vol_ratio > 1.5 {
            score = ((vix - 20.0) / 20.0 * vol_ratio / 2.0).min(1.0);
            direction_hint = "bearish";
        } else if vix > 30.0 {
            score = ((vix - 20.0) / 25.0).min(1.0);
            direction_hint = "bearish";
        } else if vix > 22.0 {
            score = ((vix - 18.0) / 20.0).min(0.4);
            direction_hint = "bearish";
        } else if vix < 15.0 && vol_ratio > 2.0 {
            score = (vol_ratio / 4.0).min(0.6);
            direction_hint = "bullish";
        }

        let healthy = spy.is_some() || vix_data.is_some();
        let details = [
            ("spy_volume".to_string(), json!(volume)),
            ("vol_ratio".to_string(), json!((vol_ratio * 100.0).round() / 100.0)),
            ("vix".to_string(), json!((vix * 100.0).round() / 100.0)),
            ("direction_hint".to_string(), json!(direction_hint)),
        ]
        .into();

        ComponentScore {
            name: "flow_imbalance".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy,
            details,
        }
    }
}

/// Deribit public book summary for BTC perpetuals, watching funding rate and
/// open-interest delta across ticks.
pub struct CryptoCascade {
    oi_history: Mutex<VecDeque<f64>>,
}

impl Default for CryptoCascade {
    fn default() -> Self {
        Self { oi_history: Mutex::new(VecDeque::with_capacity(20)) }
    }
}

impl CryptoCascade {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let body = client
            .get_json(
                "https://www.deribit.com/api/v2/public/get_book_summary_by_currency",
                &[("currency", "BTC"), ("kind", "future")],
            )
            .await;

        let Some(result) = body.as_ref().and_then(|b| b.get("result")).and_then(|r| r.as_array()) else {
            return ComponentScore {
                name: "crypto_cascade".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "deribit_failed".to_string(),
                healthy: false,
                details: Default::default(),
            };
        };

        let perpetual = result.iter().find(|item| item.get("instrument_name").and_then(|v| v.as_str()) == Some("BTC-PERPETUAL"));

        let mut score = 0.0_f64;
        let mut details = serde_json::Map::new();

        if let Some(p) = perpetual {
            let total_oi = f(p, "open_interest", 0.0);
            let btc_price = f(p, "mark_price", 0.0);
            let funding = f(p, "funding_8h", 0.0);

            details.insert("btc_price".to_string(), json!(btc_price));
            details.insert("perpetual_oi".to_string(), json!(total_oi));
            details.insert("funding_8h".to_string(), json!(funding));

            if funding.abs() > 0.0005 {
                score += (funding.abs() / 0.001).min(0.5);
            }

            if total_oi > 0.0 {
                let mut history = self.oi_history.lock().await;
                if let Some(&prev_oi) = history.back() {
                    if prev_oi > 0.0 {
                        let oi_change_pct = (total_oi - prev_oi) / prev_oi;
                        details.insert("oi_change_pct".to_string(), json!(oi_change_pct));
                        if oi_change_pct < -0.03 {
                            score += (oi_change_pct.abs() * 10.0).min(0.5);
                        } else if oi_change_pct > 0.05 {
                            score += (oi_change_pct * 5.0).min(0.3);
                        }
                    }
                }
                history.push_back(total_oi);
                if history.len() > 20 {
                    history.pop_front();
                }
            }
        }

        ComponentScore {
            name: "crypto_cascade".to_string(),
            raw: score.min(1.0),
            weight: 0.0,
            weighted: 0.0,
            source: "deribit".to_string(),
            healthy: true,
            details: details.into_iter().collect(),
        }
    }
}

pub struct PremarketGap;

impl PremarketGap {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("premarket_gap");
        };
        let Some(data) = prev_day(client, "SPY", &key).await else {
            return ComponentScore {
                name: "premarket_gap".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: false,
                details: [("error".to_string(), json!("no prev data"))].into(),
            };
        };

        let open = f(&data, "o", 0.0);
        let high = f(&data, "h", 0.0);
        let low = f(&data, "l", 0.0);
        let close = f(&data, "c", 0.0);

        if open <= 0.0 || close <= 0.0 {
            return ComponentScore {
                name: "premarket_gap".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: false,
                details: [("error".to_string(), json!("invalid prices"))].into(),
            };
        }

        let daily_move = (close - open) / open;
        let daily_range = (high - low) / close;
        let range_pct = daily_range.abs();

        let score = if range_pct > 0.025 {
            1.0
        } else if range_pct > 0.018 {
            0.7
        } else if range_pct > 0.012 {
            0.4
        } else if range_pct > 0.008 {
            0.2
        } else {
            0.0
        };

        let details = [
            ("daily_move_pct".to_string(), json!((daily_move * 10000.0).round() / 100.0)),
            ("daily_range_pct".to_string(), json!((daily_range * 10000.0).round() / 100.0)),
            ("move_direction".to_string(), json!(if daily_move > 0.0 { "up" } else { "down" })),
        ]
        .into();

        ComponentScore {
            name: "premarket_gap".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy: true,
            details,
        }
    }
}

pub struct EventProximity;

impl EventProximity {
    /// `upcoming` is the caller's list of (event name, scheduled time); the fetcher
    /// has no knowledge of event sources, only proximity arithmetic.
    pub fn fetch(&self, upcoming: &[(String, DateTime<Utc>)], now: DateTime<Utc>) -> ComponentScore {
        let mut score = 0.0_f64;
        let mut events_soon = Vec::new();

        for (name, at) in upcoming {
            let minutes_until = (*at - now).num_seconds() as f64 / 60.0;
            let band_score = if (-30.0..=30.0).contains(&minutes_until) {
                Some(1.0)
            } else if minutes_until > 30.0 && minutes_until <= 120.0 {
                Some(0.5)
            } else if minutes_until > 120.0 && minutes_until <= 1440.0 {
                Some(0.2)
            } else {
                None
            };

            if let Some(s) = band_score {
                score = score.max(s);
                events_soon.push(json!({
                    "name": name,
                    "minutes_until": minutes_until as i64,
                    "datetime": at.to_rfc3339(),
                }));
            }
        }

        ComponentScore {
            name: "event_proximity".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "calendar".to_string(),
            healthy: true,
            details: [("events_soon".to_string(), json!(events_soon))].into(),
        }
    }
}

pub struct CrossAsset;

impl CrossAsset {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("cross_asset");
        };

        let mut changes = serde_json::Map::new();
        for ticker in ["SPY", "TLT", "GLD"] {
            if let Some(data) = prev_day(client, ticker, &key).await {
                let open = f(&data, "o", 0.0);
                let close = f(&data, "c", 0.0);
                if open > 0.0 {
                    changes.insert(ticker.to_string(), json!((close - open) / open));
                }
            }
        }
        if let Some(vix_data) = prev_day(client, "I:VIX", &key).await {
            let open = f(&vix_data, "o", 20.0);
            let close = f(&vix_data, "c", 20.0);
            if open > 0.0 {
                changes.insert("VIX".to_string(), json!((close - open) / open));
            }
        }

        let numeric: Vec<f64> = changes.values().filter_map(|v| v.as_f64()).collect();
        let mut details = serde_json::Map::new();
        details.insert(
            "changes".to_string(),
            json!(changes
                .iter()
                .map(|(k, v)| (k.clone(), (v.as_f64().unwrap_or(0.0) * 10000.0).round() / 100.0))
                .collect::<serde_json::Map<_, _>>()),
        );

        if numeric.len() < 3 {
            return ComponentScore {
                name: "cross_asset".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: !numeric.is_empty(),
                details: details.into_iter().collect(),
            };
        }

        let directions: Vec<i32> = numeric
            .iter()
            .map(|v| if *v > 0.001 { 1 } else if *v < -0.001 { -1 } else { 0 })
            .collect();
        let positive = directions.iter().filter(|d| **d > 0).count();
        let negative = directions.iter().filter(|d| **d < 0).count();
        let max_aligned = positive.max(negative);

        let mut score = 0.0_f64;
        if max_aligned >= 3 {
            let avg_magnitude = numeric.iter().map(|v| v.abs()).sum::<f64>() / numeric.len() as f64;
            score = ((max_aligned as f64 / 4.0) * (avg_magnitude / 0.01)).min(1.0);
            details.insert(
                "alignment".to_string(),
                json!(if negative > positive { "risk_off" } else { "risk_on" }),
            );
        }
        details.insert("up_count".to_string(), json!(positive));
        details.insert("down_count".to_string(), json!(negative));

        ComponentScore {
            name: "cross_asset".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy: true,
            details: details.into_iter().collect(),
        }
    }
}

pub struct VolumeSurge;

impl VolumeSurge {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("volume_surge");
        };
        let Some(data) = prev_day(client, "SPY", &key).await else {
            return ComponentScore {
                name: "volume_surge".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: false,
                details: [("error".to_string(), json!("no prev data"))].into(),
            };
        };

        let volume = f(&data, "v", 0.0);
        let avg_volume = 80_000_000.0_f64;
        let vol_ratio = volume / avg_volume;

        let high = f(&data, "h", 0.0);
        let low = f(&data, "l", 0.0);
        let close = f(&data, "c", 0.0);
        let range_pct = if close > 0.0 { (high - low) / close * 100.0 } else { 0.0 };

        let score = if vol_ratio > 3.0 || range_pct > 2.5 {
            1.0
        } else if vol_ratio > 2.0 || range_pct > 2.0 {
            0.6
        } else if vol_ratio > 1.5 || range_pct > 1.5 {
            0.3
        } else if vol_ratio > 1.2 || range_pct > 1.0 {
            0.15
        } else {
            0.0
        };

        let details = [
            ("vol_ratio".to_string(), json!((vol_ratio * 100.0).round() / 100.0)),
            ("prev_range_pct".to_string(), json!((range_pct * 100.0).round() / 100.0)),
        ]
        .into();

        ComponentScore {
            name: "volume_surge".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy: true,
            details,
        }
    }
}

pub struct Breadth;

const SECTOR_ETFS: [&str; 5] = ["XLK", "XLF", "XLV", "XLY", "XLE"];

impl Breadth {
    pub async fn fetch(&self, client: &FetchClient) -> ComponentScore {
        let Some(key) = api_key() else {
            return unavailable("breadth");
        };

        let mut up_count = 0;
        let mut down_count = 0;
        let mut changes = serde_json::Map::new();

        for etf in SECTOR_ETFS {
            if let Some(data) = prev_day(client, etf, &key).await {
                let open = f(&data, "o", 0.0);
                let close = f(&data, "c", 0.0);
                if open > 0.0 {
                    let change_pct = (close - open) / open * 100.0;
                    changes.insert(etf.to_string(), json!((change_pct * 100.0).round() / 100.0));
                    if change_pct > 0.1 {
                        up_count += 1;
                    } else if change_pct < -0.1 {
                        down_count += 1;
                    }
                }
            }
        }

        let total = up_count + down_count;
        let mut details = serde_json::Map::new();
        details.insert("up_count".to_string(), json!(up_count));
        details.insert("down_count".to_string(), json!(down_count));
        details.insert("sector_changes".to_string(), json!(changes.clone()));

        if total < 3 {
            return ComponentScore {
                name: "breadth".to_string(),
                raw: 0.0,
                weight: 0.0,
                weighted: 0.0,
                source: "polygon_prev".to_string(),
                healthy: !changes.is_empty(),
                details: details.into_iter().collect(),
            };
        }

        let max_side = up_count.max(down_count);
        let breadth_ratio = max_side as f64 / SECTOR_ETFS.len() as f64;

        let score = if breadth_ratio > 0.70 {
            ((breadth_ratio - 0.70) / 0.20).min(1.0)
        } else if breadth_ratio > 0.60 {
            0.3
        } else {
            0.0
        };

        if score > 0.0 {
            details.insert(
                "collapse_direction".to_string(),
                json!(if down_count > up_count { "down" } else { "up" }),
            );
        }

        ComponentScore {
            name: "breadth".to_string(),
            raw: score,
            weight: 0.0,
            weighted: 0.0,
            source: "polygon_prev".to_string(),
            healthy: true,
            details: details.into_iter().collect(),
        }
    }
}

fn unavailable(name: &str) -> ComponentScore {
    ComponentScore {
        name: name.to_string(),
        raw: 0.0,
        weight: 0.0,
        weighted: 0.0,
        source: "no_api_key".to_string(),
        healthy: false,
        details: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_proximity_bands() {
        let now = Utc::now();
        let fetcher = EventProximity;
        let upcoming = vec![
            ("FOMC".to_string(), now + chrono::Duration::minutes(20)),
            ("CPI".to_string(), now + chrono::Duration::minutes(90)),
            ("NFP".to_string(), now + chrono::Duration::hours(20)),
        ];
        let score = fetcher.fetch(&upcoming, now);
        assert_eq!(score.raw, 1.0);
        assert!(score.healthy);
    }

    #[test]
    fn event_proximity_no_events_is_zero() {
        let fetcher = EventProximity;
        let score = fetcher.fetch(&[], Utc::now());
        assert_eq!(score.raw, 0.0);
    }

    #[tokio::test]
    async fn crypto_cascade_needs_two_samples_for_oi_delta() {
        let client = FetchClient::new(std::time::Duration::from_secs(5));
        let fetcher = CryptoCascade::default();
        let first = fetcher.fetch(&client).await;
        assert_eq!(first.name, "crypto_cascade");
    }
}
