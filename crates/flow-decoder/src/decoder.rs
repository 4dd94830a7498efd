use bedrock_client::BedrockClient;
use chrono::Utc;
use http_fetch::FetchClient;
use serde_json::Value;

use crate::aggregate::aggregate_flow;
use crate::history::HistoryStore;
use crate::types::{AggregatedFlow, Classification, FlowSnapshot, InstitutionalBias};

const SYSTEM_PROMPT: &str = "You are an institutional options flow analyst. Classify market sentiment from options trading data. \
Sweeps indicate urgency. Call premium over put premium by 2x+ is AGGRESSIVELY_BULLISH, put over call by 2x+ is AGGRESSIVELY_BEARISH, \
1.5x-2x is MODERATELY biased, within 1.5x is NEUTRAL. Large single trades ($1M+) are significant. Respond with valid JSON only.";

pub struct FlowDecoder {
    client: FetchClient,
    bedrock: BedrockClient,
    history: Option<HistoryStore>,
}

impl FlowDecoder {
    pub fn new(client: FetchClient, bedrock: BedrockClient, history: Option<HistoryStore>) -> Self {
        Self { client, bedrock, history }
    }

    /// Pulls recent Polygon options trades for `ticker`, aggregates flow, and
    /// classifies institutional bias via Haiku (rule-based fallback when
    /// Bedrock is unconfigured or its response doesn't parse). Never errors —
    /// degrades to `FlowSnapshot::empty` without an API key or any trades.
    pub async fn calculate(&self, ticker: &str) -> FlowSnapshot {
        let now = Utc::now();

        let Ok(api_key) = std::env::var("POLYGON_API_KEY") else {
            return FlowSnapshot::empty(now, ticker);
        };
        if api_key.is_empty() {
            return FlowSnapshot::empty(now, ticker);
        }

        let url = format!("https://api.polygon.io/v3/trades/O:{ticker}");
        let Some(body) = self.client.get_json(&url, &[("apiKey", &api_key), ("limit", "500"), ("order", "desc"), ("sort", "timestamp")]).await else {
            return FlowSnapshot::empty(now, ticker);
        };

        let trades = body.get("results").and_then(|r| r.as_array()).cloned().unwrap_or_default();
        let flow = aggregate_flow(&trades);

        let classification = self.classify(&flow, ticker).await;
        let premium_ratio = if flow.put_premium > 0.0 { flow.call_premium / flow.put_premium } else { 10.0 };

        let snapshot = FlowSnapshot {
            timestamp: now,
            ticker: ticker.to_string(),
            net_premium_calls: flow.call_premium.round(),
            net_premium_puts: flow.put_premium.round(),
            premium_ratio: (premium_ratio * 100.0).round() / 100.0,
            sweep_count_calls: flow.call_sweeps,
            sweep_count_puts: flow.put_sweeps,
            largest_trade: flow.largest_trade,
            institutional_bias: classification.bias,
            confidence: classification.confidence,
            total_trades_analyzed: flow.total_trades,
            haiku_analysis: classification.reasoning,
            latency_ms: classification.latency_ms,
        };

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&snapshot).await {
                tracing::warn!(error = %e, "failed to persist flow history row");
            }
        }

        snapshot
    }

    async fn classify(&self, flow: &AggregatedFlow, ticker: &str) -> Classification {
        if !self.bedrock.is_available() {
            return rule_based_classification(flow);
        }

        let largest = flow
            .largest_trade
            .as_ref()
            .map(|t| serde_json::to_string(t).unwrap_or_default())
            .unwrap_or_else(|| "{}".to_string());

        let prompt = format!(
            "Analyze this options flow for {ticker}:\n\nCall Premium: ${:.0}\nPut Premium: ${:.0}\nCall Sweeps: {}\nPut Sweeps: {}\nLargest Trade: {}\nTotal Trades: {}\n\n\
Respond with JSON:\n{{\"institutional_bias\": \"AGGRESSIVELY_BULLISH\" | \"MODERATELY_BULLISH\" | \"NEUTRAL\" | \"MODERATELY_BEARISH\" | \"AGGRESSIVELY_BEARISH\", \"confidence\": 0-100, \"reasoning\": \"one sentence explanation\"}}",
            flow.call_premium, flow.put_premium, flow.call_sweeps, flow.put_sweeps, largest, flow.total_trades
        );

        let response = self.bedrock.invoke_haiku(&prompt, Some(SYSTEM_PROMPT), 200, 0.0).await;

        if !response.success {
            tracing::warn!(error = ?response.error, "haiku flow classification failed");
            return rule_based_classification(flow);
        }

        match serde_json::from_str::<Value>(&response.content) {
            Ok(parsed) => {
                let bias = parsed.get("institutional_bias").and_then(|v| v.as_str()).map(InstitutionalBias::parse).unwrap_or(InstitutionalBias::Neutral);
                let confidence = parsed.get("confidence").and_then(|v| v.as_f64()).unwrap_or(50.0);
                let reasoning = parsed.get("reasoning").and_then(|v| v.as_str()).unwrap_or("").to_string();
                Classification { bias, confidence, reasoning, latency_ms: response.latency_ms }
            }
            Err(_) => {
                tracing::warn!(content = %response.content, "failed to parse haiku flow response");
                rule_based_classification(flow)
            }
        }
    }

    /// Conviction modifier from the flow bias and sweep dominance, §4.9.
    pub fn conviction_modifier(snapshot: &FlowSnapshot, trade_direction: &str) -> (i32, Vec<String>) {
        let mut modifier = 0;
        let mut reasons = Vec::new();
        let bias = snapshot.institutional_bias;

        let boost = if bias.is_aggressive() { 10 } else { 5 };

        if trade_direction == "BULLISH" {
            if bias.is_bullish() {
                modifier += boost;
                reasons.push(format!("flow aligns: {:?}", bias));
            } else if bias.is_bearish() {
                modifier -= boost;
                reasons.push(format!("flow conflicts: {:?}", bias));
            }
        } else if trade_direction == "BEARISH" {
            if bias.is_bearish() {
                modifier += boost;
                reasons.push(format!("flow aligns: {:?}", bias));
            } else if bias.is_bullish() {
                modifier -= boost;
                reasons.push(format!("flow conflicts: {:?}", bias));
            }
        }

        if trade_direction == "BULLISH" && snapshot.sweep_count_calls > snapshot.sweep_count_puts * 2 {
            modifier += 5;
            reasons.push(format!("call sweeps dominant ({} vs {})", snapshot.sweep_count_calls, snapshot.sweep_count_puts));
        } else if trade_direction == "BEARISH" && snapshot.sweep_count_puts > snapshot.sweep_count_calls * 2 {
            modifier += 5;
            reasons.push(format!("put sweeps dominant ({} vs {})", snapshot.sweep_count_puts, snapshot.sweep_count_calls));
        }

        (modifier, reasons)
    }
}

fn rule_based_classification(flow: &AggregatedFlow) -> Classification {
    if flow.call_premium == 0.0 && flow.put_premium == 0.0 {
        return Classification {
            bias: InstitutionalBias::Neutral,
            confidence: 50.0,
            reasoning: "no significant flow".to_string(),
            latency_ms: 0.0,
        };
    }

    let ratio = if flow.put_premium > 0.0 { flow.call_premium / flow.put_premium } else { 10.0 };

    let (bias, confidence) = if ratio > 2.5 {
        (InstitutionalBias::AggressivelyBullish, (70.0 + (ratio - 2.0) * 10.0).min(95.0))
    } else if ratio > 1.5 {
        (InstitutionalBias::ModeratelyBullish, 70.0)
    } else if ratio < 0.4 {
        (InstitutionalBias::AggressivelyBearish, (70.0 + (1.0 / ratio - 2.0) * 10.0).min(95.0))
    } else if ratio < 0.67 {
        (InstitutionalBias::ModeratelyBearish, 70.0)
    } else {
        (InstitutionalBias::Neutral, 60.0)
    };

    Classification { bias, confidence, reasoning: format!("call/put ratio: {:.2}", ratio), latency_ms: 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn no_api_key_yields_empty_snapshot() {
        std::env::remove_var("POLYGON_API_KEY");
        let decoder = FlowDecoder::new(FetchClient::new(Duration::from_secs(2)), BedrockClient::new(), None);
        let snapshot = decoder.calculate("SPY").await;
        assert_eq!(snapshot.total_trades_analyzed, 0);
        assert_eq!(snapshot.institutional_bias, InstitutionalBias::Neutral);
    }

    #[test]
    fn rule_based_classifies_bullish_dominance() {
        let flow = AggregatedFlow { call_premium: 300_000.0, put_premium: 100_000.0, call_sweeps: 0, put_sweeps: 0, largest_trade: None, total_trades: 2 };
        let classification = rule_based_classification(&flow);
        assert_eq!(classification.bias, InstitutionalBias::AggressivelyBullish);
    }

    #[test]
    fn conviction_rewards_aligned_aggressive_flow() {
        let snapshot = FlowSnapshot {
            institutional_bias: InstitutionalBias::AggressivelyBullish,
            ..FlowSnapshot::empty(Utc::now(), "SPY")
        };
        let (modifier, reasons) = FlowDecoder::conviction_modifier(&snapshot, "BULLISH");
        assert_eq!(modifier, 10);
        assert_eq!(reasons.len(), 1);
    }
}
