use hydra_core::{Signal, SignalCategory, SignalPriority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counts per priority, counts per category, and the average composite score for
/// crypto, metals, and macro — the three broad asset classes tracked end to end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total_active: usize,
    pub by_priority: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub avg_composite_by_asset_class: HashMap<String, f64>,
}

impl SignalSummary {
    pub fn build(signals: &[Signal]) -> Self {
        let mut by_priority: HashMap<String, usize> = HashMap::new();
        let mut by_category: HashMap<String, usize> = HashMap::new();

        for s in signals {
            *by_priority.entry(priority_label(s.priority).to_string()).or_insert(0) += 1;
            *by_category
                .entry(format!("{:?}", s.category).to_lowercase())
                .or_insert(0) += 1;
        }

        let avg_composite_by_asset_class = [
            ("crypto", SignalCategory::Crypto),
            ("metals", SignalCategory::Metals),
            ("macro", SignalCategory::Macro),
        ]
        .into_iter()
        .map(|(label, category)| (label.to_string(), avg_composite(signals, category)))
        .collect();

        SignalSummary {
            total_active: signals.len(),
            by_priority,
            by_category,
            avg_composite_by_asset_class,
        }
    }
}

/// Average `composite()` over signals in exactly `category`, 0.0 if none are active.
fn avg_composite(signals: &[Signal], category: SignalCategory) -> f64 {
    let (sum, count) = signals
        .iter()
        .filter(|s| s.category == category)
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.composite(), count + 1));
    if count > 0 { sum / count as f64 } else { 0.0 }
}

fn priority_label(p: SignalPriority) -> &'static str {
    match p {
        SignalPriority::Critical => "critical",
        SignalPriority::High => "high",
        SignalPriority::Medium => "medium",
        SignalPriority::Low => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn signal(category: SignalCategory, priority: SignalPriority, composite_inputs: (f64, f64, f64)) -> Signal {
        Signal {
            id: format!("{category:?}-{priority:?}"),
            name: "x".to_string(),
            source: "test".to_string(),
            category,
            priority,
            direction: composite_inputs.0,
            strength: composite_inputs.1,
            description: String::new(),
            affected_symbols: vec![],
            trade_hints: vec![],
            raw_data: Map::new(),
            detected_at: Utc::now(),
            ttl_hours: 1.0,
            reliability: composite_inputs.2,
        }
    }

    #[test]
    fn summary_counts_and_averages() {
        let signals = vec![
            signal(SignalCategory::Crypto, SignalPriority::High, (1.0, 1.0, 1.0)),
            signal(SignalCategory::Crypto, SignalPriority::Low, (0.5, 0.5, 1.0)),
            signal(SignalCategory::Macro, SignalPriority::Critical, (-1.0, 1.0, 1.0)),
        ];
        let summary = SignalSummary::build(&signals);
        assert_eq!(summary.total_active, 3);
        assert_eq!(summary.by_priority.get("high"), Some(&1));
        assert_eq!(summary.by_category.get("crypto"), Some(&2));
        let crypto_avg = summary.avg_composite_by_asset_class.get("crypto").unwrap();
        assert!((*crypto_avg - ((1.0 + 0.25) / 2.0)).abs() < 1e-9);
    }
}
