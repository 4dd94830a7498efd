use chrono::{NaiveTime, Utc};
use http_fetch::FetchClient;
use serde_json::Value;

use crate::history::HistoryStore;
use crate::math::{
    aggregate, determine_regime, find_flip_point, identify_key_levels, refresh_interval_seconds,
    time_to_expiry_years,
};
use crate::types::{GexRegime, GexSnapshot, OptionQuote};

const HIGH_POSITIVE_GEX: f64 = 500_000_000.0;

pub struct GexEngine {
    client: FetchClient,
    history: Option<HistoryStore>,
}

impl GexEngine {
    pub fn new(client: FetchClient, history: Option<HistoryStore>) -> Self {
        Self { client, history }
    }

    /// Pull a same-day options chain snapshot from Polygon for `underlying` and
    /// compute the full GEX snapshot. Returns an empty, UNKNOWN-regime snapshot
    /// when no API key is configured or the chain comes back empty — never an
    /// error, per the subsystem-degraded contract.
    pub async fn calculate(&self, underlying: &str) -> GexSnapshot {
        let now = Utc::now();

        let Ok(api_key) = std::env::var("POLYGON_API_KEY") else {
            return GexSnapshot::empty(now);
        };
        if api_key.is_empty() {
            return GexSnapshot::empty(now);
        }

        let url = format!("https://api.polygon.io/v3/snapshot/options/{underlying}");
        let Some(body) = self.client.get_json(&url, &[("apiKey", &api_key), ("limit", "250")]).await else {
            return GexSnapshot::empty(now);
        };

        let options = parse_chain(&body);
        if options.is_empty() {
            return GexSnapshot::empty(now);
        }

        let spot = options
            .iter()
            .map(|(quote, _)| *quote)
            .find(|spot| *spot > 0.0)
            .unwrap_or(0.0);
        let quotes: Vec<OptionQuote> = options.into_iter().map(|(_, q)| q).collect();

        let snapshot = self.calculate_from(&quotes, spot, now).await;
        snapshot
    }

    /// Pure compute path over an already-fetched chain; used directly by
    /// tests and by callers who source the chain another way.
    pub async fn calculate_from(&self, options: &[OptionQuote], spot: f64, now: chrono::DateTime<Utc>) -> GexSnapshot {
        if options.is_empty() || spot <= 0.0 {
            return GexSnapshot::empty(now);
        }

        let tau = time_to_expiry_years(now);
        let agg = aggregate(options, spot, tau);

        let flip_point = find_flip_point(&agg.gex_by_strike, spot);
        let flip_distance_pct = match flip_point {
            Some(fp) if spot > 0.0 => (fp - spot).abs() / spot,
            _ => 1.0,
        };

        let regime = determine_regime(agg.total_gex, flip_distance_pct);
        let hours_remaining = tau * 365.25 * 24.0;
        let charm_per_hour = if hours_remaining > 0.0 { agg.total_charm / hours_remaining } else { 0.0 };

        let levels = identify_key_levels(&agg.gex_by_strike, spot, 5);
        let refresh = refresh_interval_seconds(now, agg.total_gex, flip_distance_pct);

        let snapshot = GexSnapshot {
            timestamp: now,
            spot_price: (spot * 100.0).round() / 100.0,
            total_gex: agg.total_gex.round(),
            call_gex: agg.call_gex.round(),
            put_gex: agg.put_gex.round(),
            flip_point: flip_point.map(|f| (f * 100.0).round() / 100.0),
            flip_distance_pct: (flip_distance_pct * 10000.0).round() / 10000.0,
            regime,
            charm_flow_per_hour: charm_per_hour.round(),
            vanna_exposure: agg.total_vanna.round(),
            key_support: levels.support,
            key_resistance: levels.resistance,
            magnets: levels.magnets,
            refresh_interval_seconds: refresh,
            options_count: options.len(),
        };

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&snapshot).await {
                tracing::warn!(error = %e, "failed to persist gex history row");
            }
        }

        snapshot
    }

    /// Conviction modifier contributed by the GEX regime, per §4.8.
    pub fn conviction_modifier(snapshot: &GexSnapshot) -> (i32, Vec<String>) {
        let mut modifier = 0;
        let mut reasons = Vec::new();

        match snapshot.regime {
            GexRegime::Negative => {
                modifier += 10;
                reasons.push("negative GEX favors directional trades".to_string());
            }
            GexRegime::Positive if snapshot.total_gex.abs() > HIGH_POSITIVE_GEX => {
                modifier -= 15;
                reasons.push("high positive GEX suppresses directional moves".to_string());
            }
            _ => {}
        }

        if snapshot.flip_distance_pct < 0.005 {
            modifier += 5;
            reasons.push("spot is within 0.5% of the gamma flip point".to_string());
        }

        let final_hour = snapshot.timestamp.time() >= NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        if final_hour && snapshot.charm_flow_per_hour.abs() > 5_000_000.0 {
            modifier += 5;
            reasons.push("large charm flow in the final hour".to_string());
        }

        (modifier, reasons)
    }
}

fn parse_chain(body: &Value) -> Vec<(f64, OptionQuote)> {
    let Some(results) = body.get("results").and_then(|r| r.as_array()) else {
        return vec![];
    };

    results
        .iter()
        .filter_map(|raw| {
            let details = raw.get("details")?;
            let greeks = raw.get("greeks");
            let strike = details.get("strike_price")?.as_f64()?;
            let contract_type = details.get("contract_type")?.as_str()?;
            let underlying_price = raw
                .get("underlying_asset")
                .and_then(|u| u.get("price"))
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let open_interest = raw.get("open_interest").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let iv = raw.get("implied_volatility").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let gamma = greeks.and_then(|g| g.get("gamma")).and_then(|v| v.as_f64()).unwrap_or(0.0);
            let vega = greeks.and_then(|g| g.get("vega")).and_then(|v| v.as_f64()).unwrap_or(0.0);

            Some((
                underlying_price,
                OptionQuote {
                    strike,
                    is_call: contract_type == "call",
                    open_interest,
                    iv,
                    gamma,
                    vega,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quote(strike: f64, is_call: bool, oi: f64) -> OptionQuote {
        OptionQuote { strike, is_call, open_interest: oi, iv: 0.2, gamma: 0.05, vega: 10.0 }
    }

    #[tokio::test]
    async fn empty_chain_yields_unknown_regime() {
        let engine = GexEngine::new(FetchClient::new(Duration::from_secs(2)), None);
        let snapshot = engine.calculate_from(&[], 0.0, Utc::now()).await;
        assert_eq!(snapshot.regime, GexRegime::Unknown);
        assert_eq!(snapshot.options_count, 0);
    }

    #[tokio::test]
    async fn heavy_call_gamma_yields_positive_regime() {
        let engine = GexEngine::new(FetchClient::new(Duration::from_secs(2)), None);
        let options = vec![quote(500.0, true, 50_000.0), quote(505.0, true, 50_000.0)];
        let snapshot = engine.calculate_from(&options, 500.0, Utc::now()).await;
        assert!(snapshot.total_gex > 0.0);
        assert_eq!(snapshot.regime, GexRegime::Positive);
    }

    #[test]
    fn conviction_rewards_negative_regime() {
        let mut snapshot = GexSnapshot::empty(Utc::now());
        snapshot.regime = GexRegime::Negative;
        snapshot.flip_distance_pct = 1.0;
        let (modifier, reasons) = GexEngine::conviction_modifier(&snapshot);
        assert_eq!(modifier, 10);
        assert_eq!(reasons.len(), 1);
    }

    #[test]
    fn conviction_penalizes_strong_positive_regime() {
        let mut snapshot = GexSnapshot::empty(Utc::now());
        snapshot.regime = GexRegime::Positive;
        snapshot.total_gex = 900_000_000.0;
        snapshot.flip_distance_pct = 1.0;
        let (modifier, _) = GexEngine::conviction_modifier(&snapshot);
        assert_eq!(modifier, -15);
    }
}
