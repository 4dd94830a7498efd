use chrono::{DateTime, Utc};
use hydra_core::{BlowupResult, ComponentScore, Direction, Recommendation, Regime, Weights};
use http_fetch::FetchClient;
use std::collections::VecDeque;
use tokio::sync::{Mutex, RwLock};

use crate::fetchers::{
    Breadth, CrossAsset, CryptoCascade, EventProximity, FlowImbalance, PremarketGap, VixInversion,
    VolumeSurge,
};
use crate::history::HistoryStore;

const RING_CAPACITY: usize = 100;

/// Ties the eight component fetchers to the current weight map and produces one
/// `BlowupResult` per tick, persisting it and keeping a short in-memory ring.
pub struct Scorer {
    client: FetchClient,
    weights: RwLock<Weights>,
    vix_inversion: VixInversion,
    flow_imbalance: FlowImbalance,
    crypto_cascade: CryptoCascade,
    premarket_gap: PremarketGap,
    event_proximity: EventProximity,
    cross_asset: CrossAsset,
    volume_surge: VolumeSurge,
    breadth: Breadth,
    ring: Mutex<VecDeque<BlowupResult>>,
    history: Option<HistoryStore>,
}

impl Scorer {
    pub fn new(client: FetchClient, weights: Weights, history: Option<HistoryStore>) -> Self {
        Self {
            client,
            weights: RwLock::new(weights),
            vix_inversion: VixInversion,
            flow_imbalance: FlowImbalance,
            crypto_cascade: CryptoCascade::default(),
            premarket_gap: PremarketGap,
            event_proximity: EventProximity,
            cross_asset: CrossAsset,
            volume_surge: VolumeSurge,
            breadth: Breadth,
            ring: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
            history,
        }
    }

    pub async fn reload_weights(&self, weights: Weights) {
        *self.weights.write().await = weights;
    }

    /// Run one scorer tick. `upcoming_events` feeds `event_proximity` only;
    /// the scorer itself holds no calendar state.
    pub async fn tick(&self, upcoming_events: &[(String, DateTime<Utc>)]) -> BlowupResult {
        let now = Utc::now();
        let weights = self.weights.read().await.clone();

        let mut components = vec![
            self.vix_inversion.fetch(&self.client).await,
            self.flow_imbalance.fetch(&self.client).await,
            self.crypto_cascade.fetch(&self.client).await,
            self.premarket_gap.fetch(&self.client).await,
            self.event_proximity.fetch(upcoming_events, now),
            self.cross_asset.fetch(&self.client).await,
            self.volume_surge.fetch(&self.client).await,
            self.breadth.fetch(&self.client).await,
        ];

        for c in components.iter_mut() {
            c.weight = weights.get(&c.name);
            c.weighted = c.raw * c.weight;
        }

        let total_weighted: f64 = components.iter().map(|c| c.weighted).sum();
        let probability = (total_weighted * 100.0).round().clamp(0.0, 100.0) as u8;

        let healthy_count = components.iter().filter(|c| c.healthy).count();
        let confidence = healthy_count as f64 / components.len() as f64;

        let direction = determine_direction(&components);
        let regime = determine_regime(&components, direction);
        let recommendation = determine_recommendation(probability, direction, confidence);

        let triggers: Vec<String> = components
            .iter()
            .filter(|c| c.raw > 0.3)
            .map(|c| format!("{}:{:.2}", c.name, c.raw))
            .collect();

        let events_next_30min: Vec<String> = upcoming_events
            .iter()
            .filter(|(_, at)| (*at - now).num_minutes().abs() <= 30)
            .map(|(name, _)| name.clone())
            .collect();

        let result = BlowupResult {
            probability,
            direction,
            regime,
            confidence,
            triggers,
            recommendation,
            events_next_30min,
            timestamp: now,
            components,
        };

        {
            let mut ring = self.ring.lock().await;
            ring.push_back(result.clone());
            if ring.len() > RING_CAPACITY {
                ring.pop_front();
            }
        }

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&result).await {
                tracing::warn!(error = %e, "failed to persist blowup history row");
            }
        }

        result
    }

    pub async fn recent(&self, n: usize) -> Vec<BlowupResult> {
        let ring = self.ring.lock().await;
        ring.iter().rev().take(n).cloned().collect()
    }

    pub async fn last(&self) -> Option<BlowupResult> {
        self.ring.lock().await.back().cloned()
    }
}

fn determine_direction(components: &[ComponentScore]) -> Direction {
    let mut bullish = 0;
    let mut bearish = 0;

    for c in components {
        match c.name.as_str() {
            "vix_inversion" if c.raw > 0.3 => bearish += 1,
            "flow_imbalance" => match c.details.get("direction_hint").and_then(|v| v.as_str()) {
                Some("bearish") => bearish += 1,
                Some("bullish") => bullish += 1,
                _ => {}
            },
            "cross_asset" => match c.details.get("alignment").and_then(|v| v.as_str()) {
                Some("risk_off") => bearish += 1,
                Some("risk_on") => bullish += 1,
                _ => {}
            },
            "breadth" => match c.details.get("collapse_direction").and_then(|v| v.as_str()) {
                Some("down") => bearish += 1,
                Some("up") => bullish += 1,
                _ => {}
            },
            _ => {}
        }
    }

    if bearish >= 3 {
        Direction::Bearish
    } else if bullish >= 3 {
        Direction::Bullish
    } else {
        Direction::Neutral
    }
}

fn determine_regime(components: &[ComponentScore], direction: Direction) -> Regime {
    let vix = components
        .iter()
        .find(|c| c.name == "flow_imbalance")
        .and_then(|c| c.details.get("vix"))
        .and_then(|v| v.as_f64())
        .unwrap_or(20.0);

    let alignment = components
        .iter()
        .find(|c| c.name == "cross_asset")
        .and_then(|c| c.details.get("alignment"))
        .and_then(|v| v.as_str());

    if vix > 25.0 || direction == Direction::Bearish {
        Regime::RiskOff
    } else if vix < 18.0 && direction == Direction::Bullish {
        Regime::RiskOn
    } else if alignment.is_some() {
        Regime::Transition
    } else {
        Regime::Unknown
    }
}

fn determine_recommendation(score: u8, direction: Direction, confidence: f64) -> Recommendation {
    if confidence < 0.5 {
        return Recommendation::NoTrade;
    }
    if score < 50 {
        Recommendation::ScalpOnly
    } else if score < 70 {
        Recommendation::Straddle
    } else {
        match direction {
            Direction::Bearish => Recommendation::DirectionalPut,
            Direction::Bullish => Recommendation::DirectionalCall,
            Direction::Neutral => Recommendation::Straddle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn score(name: &str, raw: f64, details: serde_json::Value) -> ComponentScore {
        ComponentScore {
            name: name.to_string(),
            raw,
            weight: 0.1,
            weighted: raw * 0.1,
            source: "test".to_string(),
            healthy: true,
            details: details.as_object().cloned().unwrap_or_default().into_iter().collect(),
        }
    }

    #[test]
    fn direction_requires_three_votes() {
        let components = vec![
            score("vix_inversion", 0.5, serde_json::json!({})),
            score("flow_imbalance", 0.1, serde_json::json!({"direction_hint": "bearish"})),
            score("cross_asset", 0.1, serde_json::json!({"alignment": "risk_off"})),
        ];
        assert_eq!(determine_direction(&components), Direction::Bearish);
    }

    #[test]
    fn direction_neutral_below_threshold() {
        let components = vec![
            score("vix_inversion", 0.5, serde_json::json!({})),
            score("flow_imbalance", 0.1, serde_json::json!({"direction_hint": "bearish"})),
        ];
        assert_eq!(determine_direction(&components), Direction::Neutral);
    }

    #[test]
    fn recommendation_gates_on_confidence() {
        assert_eq!(determine_recommendation(90, Direction::Bullish, 0.4), Recommendation::NoTrade);
        assert_eq!(determine_recommendation(90, Direction::Bullish, 0.9), Recommendation::DirectionalCall);
        assert_eq!(determine_recommendation(40, Direction::Bullish, 0.9), Recommendation::ScalpOnly);
        assert_eq!(determine_recommendation(60, Direction::Neutral, 0.9), Recommendation::Straddle);
    }

    #[tokio::test]
    async fn tick_produces_bounded_result() {
        let client = FetchClient::new(Duration::from_secs(2));
        let scorer = Scorer::new(client, hydra_core::default_weights(), None);
        let result = scorer.tick(&[]).await;
        assert!(result.probability <= 100);
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        assert_eq!(result.components.len(), 8);
    }
}
