use bedrock_client::BedrockClient;
use chrono::Utc;
use hydra_core::Fingerprint;

use crate::history::HistoryStore;
use crate::math::{cosine_similarity, rule_based_similarity};
use crate::types::{ConvictionModifier, SequenceAnalysis, SequenceMatch, TOP_K_CANDIDATES};

const NOVA_SYSTEM_PROMPT: &str = "You are a quantitative trading analyst. Analyze historical market patterns to predict likely outcomes. \
Given current market conditions and similar historical sequences, determine the most likely direction, expected magnitude, and confidence. \
Be concise and data-driven. Focus on pattern recurrence and outcome distribution.";

pub struct SequenceMatcher {
    bedrock: BedrockClient,
    history: Option<HistoryStore>,
}

impl SequenceMatcher {
    pub fn new(bedrock: BedrockClient, history: Option<HistoryStore>) -> Self {
        Self { bedrock, history }
    }

    /// Record the day's closing fingerprint, embedding it via Bedrock when available.
    pub async fn record_daily_conditions(&self, mut fingerprint: Fingerprint) {
        if self.bedrock.is_available() {
            fingerprint.embedding = self.bedrock.embed(&fingerprint.to_text()).await;
        }

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&fingerprint).await {
                tracing::warn!(error = %e, "failed to persist daily fingerprint");
            }
        }
    }

    pub async fn update_outcome(&self, date: chrono::NaiveDate, outcome: f64) {
        if let Some(history) = &self.history {
            if let Err(e) = history.update_outcome(date, outcome).await {
                tracing::warn!(error = %e, "failed to update sequence outcome");
            }
        }
    }

    /// Finds the top-K most similar historical days with a known outcome,
    /// preferring embedding cosine similarity and falling back to the
    /// 7-factor rule-based score whenever either side lacks an embedding.
    pub async fn find_similar_sequences(&self, current: &Fingerprint, top_k: usize) -> Vec<SequenceMatch> {
        let Some(history) = &self.history else {
            return vec![];
        };

        let current_embedding = if self.bedrock.is_available() {
            self.bedrock.embed(&current.to_text()).await
        } else {
            None
        };

        let historical = match history.load_history().await {
            Ok(fps) => fps,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load sequence history");
                return vec![];
            }
        };

        let mut matches: Vec<SequenceMatch> = historical
            .into_iter()
            .filter_map(|fp| {
                let outcome = fp.outcome?;
                let similarity = match (&current_embedding, &fp.embedding) {
                    (Some(a), Some(b)) => cosine_similarity(a, b),
                    _ => rule_based_similarity(current, &fp),
                };
                Some(SequenceMatch { date: fp.date, similarity: (similarity * 10000.0).round() / 10000.0, conditions: fp, outcome })
            })
            .collect();

        matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        matches
    }

    /// Statistical summary plus, when Bedrock is configured, a Nova Pro
    /// narrative over the top-K similar sequences. Degrades to a pure
    /// statistical narrative when Nova is unavailable or fails to parse.
    pub async fn analyze(&self, current: Fingerprint) -> SequenceAnalysis {
        let start = std::time::Instant::now();
        let now = Utc::now();

        let similar = self.find_similar_sequences(&current, TOP_K_CANDIDATES).await;
        if similar.is_empty() {
            return SequenceAnalysis::no_match(now, current);
        }

        let outcomes: Vec<f64> = similar.iter().map(|s| s.outcome).collect();
        let avg_outcome = outcomes.iter().sum::<f64>() / outcomes.len() as f64;
        let bullish_count = outcomes.iter().filter(|o| **o > 0.1).count();
        let win_rate = bullish_count as f64 / outcomes.len() as f64;

        let fallback_direction = |avg: f64| {
            if avg > 0.1 {
                "BULLISH"
            } else if avg < -0.1 {
                "BEARISH"
            } else {
                "NEUTRAL"
            }
        };

        let (predicted_direction, confidence, nova_analysis) = if self.bedrock.is_available() {
            let prompt = build_nova_prompt(&current, &similar);
            let response = self.bedrock.invoke_nova(&prompt, Some(NOVA_SYSTEM_PROMPT), 300, 0.0).await;

            if response.success {
                match serde_json::from_str::<serde_json::Value>(&response.content) {
                    Ok(parsed) => {
                        let direction = parsed.get("predicted_direction").and_then(|v| v.as_str()).unwrap_or("NEUTRAL").to_string();
                        let confidence = parsed.get("confidence").and_then(|v| v.as_i64()).unwrap_or(50) as i32;
                        let analysis = parsed.get("key_pattern").and_then(|v| v.as_str()).unwrap_or("").to_string();
                        (direction, confidence, analysis)
                    }
                    Err(_) => {
                        let direction = fallback_direction(avg_outcome).to_string();
                        let confidence = 50 + (avg_outcome.abs() * 10.0) as i32;
                        (direction, confidence, response.content)
                    }
                }
            } else {
                let direction = fallback_direction(avg_outcome).to_string();
                let confidence = 50 + (avg_outcome.abs() * 10.0) as i32;
                (direction, confidence, format!("Nova unavailable: {}", response.error.unwrap_or_default()))
            }
        } else {
            let direction = fallback_direction(avg_outcome).to_string();
            let confidence = 50 + (avg_outcome.abs() * 10.0) as i32;
            (direction, confidence, format!("Pattern match based on {} similar days, avg outcome {:+.2}%", similar.len(), avg_outcome))
        };

        SequenceAnalysis {
            timestamp: now,
            current_conditions: current,
            similar_sequences: similar,
            predicted_direction,
            historical_win_rate: (win_rate * 100.0).round() / 100.0,
            average_outcome: (avg_outcome * 100.0).round() / 100.0,
            nova_analysis,
            confidence,
            latency_ms: (start.elapsed().as_secs_f64() * 1000.0 * 10.0).round() / 10.0,
        }
    }

    /// Conviction modifier from historical win rate for the given trade direction, §4.11.
    pub async fn conviction_modifier(&self, trade_direction: &str, current: &Fingerprint) -> ConvictionModifier {
        let similar = self.find_similar_sequences(current, TOP_K_CANDIDATES).await;
        if similar.is_empty() {
            return ConvictionModifier::none();
        }

        let outcomes: Vec<f64> = similar.iter().map(|s| s.outcome).collect();
        let avg_outcome = outcomes.iter().sum::<f64>() / outcomes.len() as f64;

        let win_rate = match trade_direction {
            "BULLISH" => outcomes.iter().filter(|o| **o > 0.0).count() as f64 / outcomes.len() as f64,
            "BEARISH" => outcomes.iter().filter(|o| **o < 0.0).count() as f64 / outcomes.len() as f64,
            _ => 0.5,
        };

        let mut modifier = 0;
        let mut reasons = Vec::new();

        if matches!(trade_direction, "BULLISH" | "BEARISH") {
            let bias = trade_direction.to_lowercase();
            if win_rate >= 0.7 {
                modifier += 15;
                reasons.push(format!("historical win rate: {:.0}% {}", win_rate * 100.0, bias));
            } else if win_rate >= 0.6 {
                modifier += 8;
                reasons.push(format!("historical win rate: {:.0}% {}", win_rate * 100.0, bias));
            } else if win_rate < 0.4 {
                modifier -= 10;
                reasons.push(format!("historical win rate: {:.0}% {} (opposing history)", win_rate * 100.0, bias));
            }
        }

        ConvictionModifier { modifier, reasons, similar_sequences: similar.len(), avg_outcome: (avg_outcome * 100.0).round() / 100.0 }
    }
}

fn build_nova_prompt(current: &Fingerprint, similar: &[SequenceMatch]) -> String {
    let sequence_text = similar
        .iter()
        .map(|s| {
            format!(
                "- {}: similarity {:.2}, conditions {}, next day outcome {:+.2}%",
                s.date,
                s.similarity,
                s.conditions.to_text(),
                s.outcome
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Current market conditions:\n{}\n\nMost similar historical sequences:\n{}\n\n\
Based on these {} similar historical patterns:\n\
1. What is the most likely direction for the next trading session?\n\
2. What is your confidence level (0-100)?\n\
3. What is the key pattern driving this prediction?\n\n\
Respond with JSON:\n\
{{\"predicted_direction\": \"BULLISH\" | \"BEARISH\" | \"NEUTRAL\", \"confidence\": 0-100, \"expected_magnitude\": \"percentage range\", \"key_pattern\": \"one sentence\"}}",
        current.to_text(),
        sequence_text,
        similar.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fp(date: NaiveDate, outcome: Option<f64>) -> Fingerprint {
        Fingerprint {
            date,
            gex_regime: "NEGATIVE".to_string(),
            flow_bias: "AGGRESSIVELY_BULLISH".to_string(),
            dark_pool_bias: "BUY".to_string(),
            vix: 19.5,
            spy_change_pct: 1.2,
            spy_range_pct: 1.5,
            blowup_score: 35,
            outcome,
            embedding: None,
        }
    }

    #[tokio::test]
    async fn no_history_yields_no_match_analysis() {
        let matcher = SequenceMatcher::new(BedrockClient::new(), None);
        let analysis = matcher.analyze(fp(Utc::now().date_naive(), None)).await;
        assert_eq!(analysis.predicted_direction, "NEUTRAL");
        assert!(analysis.similar_sequences.is_empty());
    }

    #[tokio::test]
    async fn finds_matches_and_ranks_by_similarity() {
        let history = HistoryStore::new("sqlite::memory:").await.unwrap();
        let today = Utc::now().date_naive();
        let exact_match = fp(today - chrono::Duration::days(1), Some(0.8));
        let mut distant = fp(today - chrono::Duration::days(2), Some(-0.5));
        distant.gex_regime = "POSITIVE".to_string();
        distant.flow_bias = "NEUTRAL".to_string();
        history.record(&exact_match).await.unwrap();
        history.record(&distant).await.unwrap();

        let matcher = SequenceMatcher::new(BedrockClient::new(), Some(history));
        let current = fp(today, None);
        let matches = matcher.find_similar_sequences(&current, 5).await;

        assert_eq!(matches.len(), 2);
        assert!(matches[0].similarity >= matches[1].similarity);
    }

    #[tokio::test]
    async fn conviction_modifier_rewards_consistent_bullish_history() {
        let history = HistoryStore::new("sqlite::memory:").await.unwrap();
        let today = Utc::now().date_naive();
        for i in 1..=5 {
            history.record(&fp(today - chrono::Duration::days(i), Some(0.5))).await.unwrap();
        }

        let matcher = SequenceMatcher::new(BedrockClient::new(), Some(history));
        let current = fp(today, None);
        let result = matcher.conviction_modifier("BULLISH", &current).await;
        assert_eq!(result.modifier, 15);
    }
}
