use chrono::Utc;
use dark_pool_mapper::{DarkPoolMapper, DarkPoolSnapshot};
use flow_decoder::{FlowDecoder, FlowSnapshot, InstitutionalBias};
use gex_engine::{GexEngine, GexSnapshot};
use hydra_core::Fingerprint;
use sequence_matcher::{SequenceAnalysis, SequenceMatcher};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{ConvictionBreakdown, IntelligenceSnapshot};

/// Combines the scorer with the four auxiliary subsystems into one
/// always-answerable snapshot, and composes their conviction subrules into a
/// single modifier. Holds only the latest published value of each subsystem —
/// it never drives a poll itself and never mutates what it holds, per §4.7.
pub struct IntelligenceAggregator {
    scorer: Arc<blowup_scorer::Scorer>,
    gamma: RwLock<Option<GexSnapshot>>,
    flow: RwLock<Option<FlowSnapshot>>,
    dark_pool: RwLock<Option<DarkPoolSnapshot>>,
    sequence: RwLock<Option<SequenceAnalysis>>,
    sequence_matcher: Arc<SequenceMatcher>,
    default_ticker: String,
}

impl IntelligenceAggregator {
    pub fn new(
        scorer: Arc<blowup_scorer::Scorer>,
        sequence_matcher: Arc<SequenceMatcher>,
        default_ticker: impl Into<String>,
    ) -> Self {
        Self {
            scorer,
            gamma: RwLock::new(None),
            flow: RwLock::new(None),
            dark_pool: RwLock::new(None),
            sequence: RwLock::new(None),
            sequence_matcher,
            default_ticker: default_ticker.into(),
        }
    }

    pub async fn publish_gamma(&self, snapshot: GexSnapshot) {
        *self.gamma.write().await = Some(snapshot);
    }

    pub async fn publish_flow(&self, snapshot: FlowSnapshot) {
        *self.flow.write().await = Some(snapshot);
    }

    pub async fn publish_dark_pool(&self, snapshot: DarkPoolSnapshot) {
        *self.dark_pool.write().await = Some(snapshot);
    }

    pub async fn publish_sequence(&self, analysis: SequenceAnalysis) {
        *self.sequence.write().await = Some(analysis);
    }

    /// Answers in O(1): every field is a cheap clone of an already-published
    /// value, never a fresh poll. §4.7's non-blocking contract.
    pub async fn snapshot(&self) -> IntelligenceSnapshot {
        let now = Utc::now();
        let blowup = self.scorer.last().await;
        let gamma = self
            .gamma
            .read()
            .await
            .clone()
            .unwrap_or_else(|| GexSnapshot::empty(now));
        let flow = self
            .flow
            .read()
            .await
            .clone()
            .unwrap_or_else(|| FlowSnapshot::empty(now, &self.default_ticker));
        let dark_pool = self
            .dark_pool
            .read()
            .await
            .clone()
            .unwrap_or_else(|| DarkPoolSnapshot::empty(now, &self.default_ticker));
        let sequence = self.sequence.read().await.clone();

        IntelligenceSnapshot {
            timestamp: now,
            blowup,
            gamma,
            flow,
            dark_pool,
            sequence,
        }
    }

    /// Composes the four subrules (§4.8-§4.11) into one conviction modifier.
    /// With every subsystem snapshot absent this returns exactly 0 and no
    /// reasons (Invariant 7), since each subrule degrades to `(0, [])` on its
    /// documented empty/default input.
    pub async fn conviction(
        &self,
        direction: &str,
        entry: f64,
        stop: f64,
        target: f64,
    ) -> ConvictionBreakdown {
        let snap = self.snapshot().await;

        let (gamma_modifier, mut reasons) = GexEngine::conviction_modifier(&snap.gamma);
        let (flow_modifier, flow_reasons) = FlowDecoder::conviction_modifier(&snap.flow, direction);
        reasons.extend(flow_reasons);
        let (dark_pool_modifier, dp_reasons) =
            DarkPoolMapper::conviction_modifier(&snap.dark_pool, entry, stop, target);
        reasons.extend(dp_reasons);

        let fingerprint = self.current_fingerprint(&snap);
        let seq_mod = self
            .sequence_matcher
            .conviction_modifier(direction, &fingerprint)
            .await;
        reasons.extend(seq_mod.reasons.clone());

        ConvictionBreakdown {
            total_modifier: gamma_modifier + flow_modifier + dark_pool_modifier + seq_mod.modifier,
            gamma_modifier,
            flow_modifier,
            dark_pool_modifier,
            sequence_modifier: seq_mod.modifier,
            reasons,
        }
    }

    /// Builds a Fingerprint from the latest published snapshot, for
    /// `/api/sequence/analyze` and any other caller that needs the same
    /// conditions the conviction rule itself uses.
    pub async fn build_fingerprint(&self) -> Fingerprint {
        let snap = self.snapshot().await;
        self.current_fingerprint(&snap)
    }

    /// Builds the day's Fingerprint from whatever the aggregator currently
    /// has published, for the sequence-matcher's win-rate conviction rule.
    /// `vix`/`spy_change_pct`/`spy_range_pct` fall back to neutral defaults
    /// when the scorer hasn't yet produced a tick carrying them.
    fn current_fingerprint(&self, snap: &IntelligenceSnapshot) -> Fingerprint {
        let vix = snap
            .blowup
            .as_ref()
            .and_then(|b| b.components.iter().find(|c| c.name == "flow_imbalance"))
            .and_then(|c| c.details.get("vix"))
            .and_then(|v| v.as_f64())
            .unwrap_or(20.0);

        let dark_pool_bias = if snap.dark_pool.buy_volume > snap.dark_pool.sell_volume * 1.2 {
            "BULLISH"
        } else if snap.dark_pool.sell_volume > snap.dark_pool.buy_volume * 1.2 {
            "BEARISH"
        } else {
            "NEUTRAL"
        };

        Fingerprint {
            date: snap.timestamp.date_naive(),
            gex_regime: format!("{:?}", snap.gamma.regime).to_uppercase(),
            flow_bias: flow_bias_label(snap.flow.institutional_bias),
            dark_pool_bias: dark_pool_bias.to_string(),
            vix,
            spy_change_pct: 0.0,
            spy_range_pct: 0.0,
            blowup_score: snap.blowup.as_ref().map(|b| b.probability).unwrap_or(0),
            outcome: None,
            embedding: None,
        }
    }
}

fn flow_bias_label(bias: InstitutionalBias) -> String {
    match bias {
        InstitutionalBias::AggressivelyBullish | InstitutionalBias::ModeratelyBullish => {
            "BULLISH".to_string()
        }
        InstitutionalBias::AggressivelyBearish | InstitutionalBias::ModeratelyBearish => {
            "BEARISH".to_string()
        }
        InstitutionalBias::Neutral => "NEUTRAL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_client::BedrockClient;
    use std::time::Duration;

    async fn empty_aggregator() -> IntelligenceAggregator {
        let client = http_fetch::FetchClient::new(Duration::from_secs(2));
        let scorer = Arc::new(blowup_scorer::Scorer::new(
            client,
            hydra_core::default_weights(),
            None,
        ));
        let bedrock = BedrockClient::new();
        let matcher = Arc::new(SequenceMatcher::new(bedrock, None));
        IntelligenceAggregator::new(scorer, matcher, "SPY")
    }

    #[tokio::test]
    async fn snapshot_never_blocks_and_has_defined_defaults() {
        let agg = empty_aggregator().await;
        let snap = agg.snapshot().await;
        assert!(snap.blowup.is_none());
        assert_eq!(snap.gamma.regime, gex_engine::GexRegime::Unknown);
        assert_eq!(snap.flow.institutional_bias, InstitutionalBias::Neutral);
        assert!(snap.dark_pool.levels.is_empty());
        assert!(snap.sequence.is_none());
    }

    #[tokio::test]
    async fn conviction_is_zero_with_no_reasons_when_all_subsystems_absent() {
        let agg = empty_aggregator().await;
        let result = agg.conviction("BULLISH", 100.0, 95.0, 110.0).await;
        assert_eq!(result.total_modifier, 0);
        assert!(result.reasons.is_empty());
    }

    #[tokio::test]
    async fn snapshot_reflects_published_subsystem_values() {
        let agg = empty_aggregator().await;
        let now = Utc::now();
        let mut gamma = GexSnapshot::empty(now);
        gamma.regime = gex_engine::GexRegime::Negative;
        agg.publish_gamma(gamma).await;

        let snap = agg.snapshot().await;
        assert_eq!(snap.gamma.regime, gex_engine::GexRegime::Negative);

        let result = agg.conviction("BULLISH", 100.0, 95.0, 110.0).await;
        assert_eq!(result.gamma_modifier, 10);
    }
}
