use anyhow::Result;
use hydra_core::{TradeFeedback, Weights};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::history::HistoryStore;
use crate::types::{CalibrationOutcome, CalibrationResult, TradeStats, TriggerStats};

const MIN_FEEDBACK_ROWS: usize = 20;
const PERSIST_THRESHOLD: f64 = 0.10;
const BLOWUP_SCORE_THRESHOLD: u8 = 60;
const MOVE_THRESHOLD_PCT: f64 = 0.8;

/// Ingests trade-outcome feedback and periodically re-derives the scorer's
/// component weights from observed per-trigger precision/recall, §4.12.
pub struct WeightCalibrator {
    history: HistoryStore,
    weights_path: PathBuf,
    weights: RwLock<Weights>,
}

impl WeightCalibrator {
    pub async fn new(history: HistoryStore, weights_path: PathBuf) -> Result<Self> {
        let weights = load_weights(&weights_path).unwrap_or_else(hydra_core::default_weights);
        Ok(Self {
            history,
            weights_path,
            weights: RwLock::new(weights),
        })
    }

    pub async fn current_weights(&self) -> Weights {
        self.weights.read().await.clone()
    }

    pub async fn record_feedback(&self, fb: &TradeFeedback) -> Result<bool> {
        self.history.record_feedback(fb).await
    }

    pub async fn record_accuracy(
        &self,
        ts: chrono::DateTime<chrono::Utc>,
        score: u8,
        move_pct_30min: Option<f64>,
        predicted_direction: &str,
        actual_direction: Option<&str>,
        triggers: &[String],
    ) -> Result<()> {
        self.history
            .record_accuracy(ts, score, move_pct_30min, predicted_direction, actual_direction, triggers)
            .await
    }

    /// Idempotent: running it twice against the same feedback corpus produces
    /// identical new weights (Invariant 10), since it is a pure function of
    /// the persisted rows.
    pub async fn calibrate(&self) -> Result<CalibrationOutcome> {
        let rows = self.history.feedback_by_mode("BLOWUP").await?;
        if rows.len() < MIN_FEEDBACK_ROWS {
            return Ok(CalibrationOutcome::Skipped {
                reason: format!(
                    "insufficient BLOWUP-mode feedback: need >= {MIN_FEEDBACK_ROWS}, have {}",
                    rows.len()
                ),
            });
        }

        let old_weights = self.weights.read().await.clone();
        let per_trigger = trigger_stats(&rows);
        let new_weights = rederive_weights(&old_weights, &per_trigger);
        let direction_accuracy = direction_accuracy(&rows);
        let (overall_precision, overall_recall) = self.overall_accuracy().await?;

        let weight_delta: f64 = union_keys(&old_weights.values, &new_weights.values)
            .map(|k| (new_weights.get(&k) - old_weights.get(&k)).abs())
            .sum();

        let persisted = weight_delta > PERSIST_THRESHOLD;
        let notes = if persisted {
            format!("weights updated, Σ|Δ|={weight_delta:.4} > {PERSIST_THRESHOLD}")
        } else {
            format!("no change, Σ|Δ|={weight_delta:.4} <= {PERSIST_THRESHOLD}")
        };

        if persisted {
            *self.weights.write().await = new_weights.clone();
            if let Err(e) = save_weights(&self.weights_path, &new_weights) {
                tracing::warn!(error = %e, "failed to persist calibrated weights");
            }
            tracing::info!(delta = weight_delta, "calibration: weights updated");
        } else {
            tracing::info!(delta = weight_delta, "calibration: no change");
        }

        let result = CalibrationResult {
            old_weights: old_weights.values.clone(),
            new_weights: new_weights.values.clone(),
            per_trigger,
            direction_accuracy,
            overall_precision,
            overall_recall,
            weight_delta,
            persisted,
            notes,
        };

        let today = chrono::Utc::now().date_naive();
        if let Err(e) = self.history.log_calibration(today, &result).await {
            tracing::warn!(error = %e, "failed to persist calibration log");
        }

        Ok(CalibrationOutcome::Completed(result))
    }

    /// Win rate and average PnL over BLOWUP-mode feedback entered within the
    /// last `days` days. `days <= 0` is treated as "all time".
    pub async fn stats(&self, days: i64) -> Result<TradeStats> {
        let rows = self.history.feedback_by_mode("BLOWUP").await?;
        let cutoff = chrono::Utc::now() - chrono::Duration::days(days.max(1));
        let in_window: Vec<_> = rows
            .iter()
            .filter(|r| days <= 0 || r.entry_time >= cutoff)
            .collect();

        let total_trades = in_window.len();
        let wins = in_window.iter().filter(|r| is_win(r)).count();
        let avg_pnl_pct = if total_trades > 0 {
            in_window.iter().map(|r| r.pnl_pct.unwrap_or(0.0)).sum::<f64>() / total_trades as f64
        } else {
            0.0
        };

        Ok(TradeStats {
            total_trades,
            wins,
            win_rate: if total_trades > 0 { wins as f64 / total_trades as f64 } else { 0.0 },
            avg_pnl_pct,
            days,
        })
    }

    async fn overall_accuracy(&self) -> Result<(f64, f64)> {
        let rows = self.history.accuracy_rows().await?;
        if rows.is_empty() {
            return Ok((0.0, 0.0));
        }

        let high_score: Vec<_> = rows.iter().filter(|(s, _)| *s > BLOWUP_SCORE_THRESHOLD).collect();
        let precision = if high_score.is_empty() {
            0.0
        } else {
            let hits = high_score
                .iter()
                .filter(|(_, m)| m.map(|v| v.abs() > MOVE_THRESHOLD_PCT).unwrap_or(false))
                .count();
            hits as f64 / high_score.len() as f64
        };

        let big_moves: Vec<_> = rows
            .iter()
            .filter(|(_, m)| m.map(|v| v.abs() > MOVE_THRESHOLD_PCT).unwrap_or(false))
            .collect();
        let recall = if big_moves.is_empty() {
            0.0
        } else {
            let hits = big_moves.iter().filter(|(s, _)| *s > BLOWUP_SCORE_THRESHOLD).count();
            hits as f64 / big_moves.len() as f64
        };

        Ok((precision, recall))
    }
}

fn trigger_name(raw: &str) -> &str {
    raw.split(':').next().unwrap_or(raw)
}

fn is_win(fb: &TradeFeedback) -> bool {
    fb.pnl_pct.unwrap_or(0.0) > 0.0
}

fn trigger_stats(rows: &[TradeFeedback]) -> Vec<TriggerStats> {
    let total_winners = rows.iter().filter(|r| is_win(r)).count().max(1) as f64;

    let mut acc: HashMap<String, (u32, u32, f64)> = HashMap::new();
    for row in rows {
        let win = is_win(row);
        let pnl = row.pnl_pct.unwrap_or(0.0);
        for raw in &row.entry_triggers {
            let name = trigger_name(raw).to_string();
            let entry = acc.entry(name).or_insert((0, 0, 0.0));
            entry.1 += 1;
            entry.2 += pnl;
            if win {
                entry.0 += 1;
            }
        }
    }

    acc.into_iter()
        .map(|(trigger, (wins, total, sum_pnl))| {
            let precision = if total > 0 { wins as f64 / total as f64 } else { 0.0 };
            let recall = wins as f64 / total_winners;
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            TriggerStats {
                trigger,
                wins,
                total,
                precision,
                recall,
                f1,
                avg_pnl_pct: if total > 0 { sum_pnl / total as f64 } else { 0.0 },
            }
        })
        .collect()
}

/// `new[t] = F1(t) / ΣF1`, preserving any key present in `old` but absent from
/// this round's triggers, then renormalized so every weight sums to 1.0.
fn rederive_weights(old: &Weights, stats: &[TriggerStats]) -> Weights {
    let s: f64 = stats.iter().map(|t| t.f1).sum();
    let mut values = old.values.clone();

    if s > 0.0 {
        for t in stats {
            values.insert(t.trigger.clone(), t.f1 / s);
        }
    }

    Weights { values }.renormalized()
}

fn direction_accuracy(rows: &[TradeFeedback]) -> f64 {
    let labeled: Vec<_> = rows.iter().filter(|r| r.entry_direction.is_some()).collect();
    if labeled.is_empty() {
        return 0.0;
    }
    let matches = labeled
        .iter()
        .filter(|r| {
            let predicted = r.entry_direction.unwrap();
            let pnl = r.pnl_pct.unwrap_or(0.0);
            let actual_bullish = if r.direction.eq_ignore_ascii_case("CALL") {
                pnl > 0.0
            } else {
                pnl < 0.0
            };
            match predicted {
                hydra_core::Direction::Bullish => actual_bullish,
                hydra_core::Direction::Bearish => !actual_bullish,
                hydra_core::Direction::Neutral => true,
            }
        })
        .count();
    matches as f64 / labeled.len() as f64
}

fn union_keys<'a>(a: &'a HashMap<String, f64>, b: &'a HashMap<String, f64>) -> impl Iterator<Item = String> + 'a {
    let mut keys: Vec<String> = a.keys().chain(b.keys()).cloned().collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
}

fn load_weights(path: &PathBuf) -> Option<Weights> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

fn save_weights(path: &PathBuf, weights: &Weights) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(weights)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;

    fn feedback(id: &str, triggers: Vec<&str>, pnl: f64) -> TradeFeedback {
        TradeFeedback {
            trade_id: id.to_string(),
            ticker: "SPY".to_string(),
            direction: "CALL".to_string(),
            mode: "BLOWUP".to_string(),
            entry_time: chrono::Utc::now(),
            exit_time: Some(chrono::Utc::now()),
            pnl_pct: Some(pnl),
            conviction: Some(20),
            entry_blowup_score: Some(72),
            entry_direction: Some(hydra_core::Direction::Bullish),
            entry_triggers: triggers.into_iter().map(|t| t.to_string()).collect(),
            entry_regime: Some(hydra_core::Regime::RiskOn),
        }
    }

    async fn calibrator_with_rows(n: usize, vix_good: bool) -> WeightCalibrator {
        let history = HistoryStore::new("sqlite::memory:").await.unwrap();
        for i in 0..n {
            let win = if vix_good { i % 10 != 9 } else { i % 10 == 0 };
            let pnl = if win { 3.0 } else { -2.0 };
            let fb = feedback(&format!("t{i}"), vec!["vix_inversion:0.5", "breadth:0.4"], pnl);
            history.record_feedback(&fb).await.unwrap();
        }
        WeightCalibrator::new(history, std::env::temp_dir().join(format!("hydra_test_weights_{n}_{vix_good}.json")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn skips_below_minimum_rows() {
        let calibrator = calibrator_with_rows(5, true).await;
        let outcome = calibrator.calibrate().await.unwrap();
        assert!(matches!(outcome, CalibrationOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn calibrate_is_idempotent() {
        let calibrator = calibrator_with_rows(40, true).await;
        let first = calibrator.calibrate().await.unwrap();
        let second = calibrator.calibrate().await.unwrap();
        match (first, second) {
            (CalibrationOutcome::Completed(a), CalibrationOutcome::Completed(b)) => {
                assert_eq!(a.new_weights.len(), b.new_weights.len());
                for (k, v) in &a.new_weights {
                    assert!((v - b.new_weights[k]).abs() < 1e-9);
                }
            }
            _ => panic!("expected completed calibration"),
        }
    }

    #[tokio::test]
    async fn new_weights_sum_to_one() {
        let calibrator = calibrator_with_rows(40, true).await;
        if let CalibrationOutcome::Completed(result) = calibrator.calibrate().await.unwrap() {
            let sum: f64 = result.new_weights.values().sum();
            assert!((sum - 1.0).abs() < 1e-3);
        } else {
            panic!("expected completed calibration");
        }
    }

    #[tokio::test]
    async fn high_f1_trigger_gains_weight_over_low_f1_trigger() {
        let history = HistoryStore::new("sqlite::memory:").await.unwrap();
        for i in 0..40 {
            let win = i % 5 != 0; // 80% win rate when vix_inversion present
            let pnl = if win { 3.0 } else { -2.0 };
            let fb = feedback(&format!("t{i}"), vec!["vix_inversion:0.5"], pnl);
            history.record_feedback(&fb).await.unwrap();
        }
        for i in 40..80 {
            let win = i % 10 == 0; // 10% win rate when breadth present
            let pnl = if win { 3.0 } else { -2.0 };
            let fb = feedback(&format!("t{i}"), vec!["breadth:0.4"], pnl);
            history.record_feedback(&fb).await.unwrap();
        }

        let calibrator = WeightCalibrator::new(
            history,
            std::env::temp_dir().join("hydra_test_weights_f1.json"),
        )
        .await
        .unwrap();

        if let CalibrationOutcome::Completed(result) = calibrator.calibrate().await.unwrap() {
            assert!(result.new_weights["vix_inversion"] > result.old_weights["vix_inversion"]);
            assert!(result.new_weights["breadth"] < result.old_weights["breadth"]);
        } else {
            panic!("expected completed calibration");
        }
    }

    #[tokio::test]
    async fn stats_reports_win_rate_and_avg_pnl() {
        let calibrator = calibrator_with_rows(10, true).await;
        let stats = calibrator.stats(0).await.unwrap();
        assert_eq!(stats.total_trades, 10);
        assert_eq!(stats.wins, 9);
        assert!((stats.win_rate - 0.9).abs() < 1e-9);
    }
}
