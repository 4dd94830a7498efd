use anyhow::Result;
use chrono::{DateTime, Utc};
use hydra_core::TradeFeedback;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::types::CalibrationResult;

/// Durable store for `trade_feedback.db`: feedback rows (idempotent per trade
/// id), the calibration log, and the realized-move accuracy time series that
/// feeds `calibrate()`'s overall precision/recall figures.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Insert-or-ignore on `trade_id` so posting the same feedback twice
    /// yields a single row (Invariant 9).
    pub async fn record_feedback(&self, fb: &TradeFeedback) -> Result<bool> {
        let triggers = serde_json::to_string(&fb.entry_triggers)?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO feedback \
             (trade_id, ticker, direction, mode, entry_time, exit_time, pnl_pct, conviction, \
              entry_blowup_score, entry_direction, entry_triggers, entry_regime) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fb.trade_id)
        .bind(&fb.ticker)
        .bind(&fb.direction)
        .bind(&fb.mode)
        .bind(fb.entry_time.to_rfc3339())
        .bind(fb.exit_time.map(|t| t.to_rfc3339()))
        .bind(fb.pnl_pct)
        .bind(fb.conviction)
        .bind(fb.entry_blowup_score.map(|s| s as i64))
        .bind(fb.entry_direction.map(|d| format!("{d:?}")))
        .bind(triggers)
        .bind(fb.entry_regime.map(|r| format!("{r:?}")))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All feedback rows whose `mode` matches (case-insensitively), used by
    /// `calibrate()`'s BLOWUP-mode gate.
    pub async fn feedback_by_mode(&self, mode: &str) -> Result<Vec<TradeFeedback>> {
        let rows = sqlx::query(
            "SELECT trade_id, ticker, direction, mode, entry_time, exit_time, pnl_pct, \
             conviction, entry_blowup_score, entry_direction, entry_triggers, entry_regime \
             FROM feedback WHERE UPPER(mode) = UPPER(?)",
        )
        .bind(mode)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_triggers: String = row.try_get("entry_triggers")?;
            let entry_time: String = row.try_get("entry_time")?;
            let exit_time: Option<String> = row.try_get("exit_time")?;
            out.push(TradeFeedback {
                trade_id: row.try_get("trade_id")?,
                ticker: row.try_get("ticker")?,
                direction: row.try_get("direction")?,
                mode: row.try_get("mode")?,
                entry_time: DateTime::parse_from_rfc3339(&entry_time)?.with_timezone(&Utc),
                exit_time: exit_time
                    .map(|t| DateTime::parse_from_rfc3339(&t).map(|d| d.with_timezone(&Utc)))
                    .transpose()?,
                pnl_pct: row.try_get("pnl_pct")?,
                conviction: row.try_get("conviction")?,
                entry_blowup_score: row
                    .try_get::<Option<i64>, _>("entry_blowup_score")?
                    .map(|s| s as u8),
                entry_direction: row
                    .try_get::<Option<String>, _>("entry_direction")?
                    .and_then(|d| parse_direction(&d)),
                entry_triggers: serde_json::from_str(&entry_triggers).unwrap_or_default(),
                entry_regime: row
                    .try_get::<Option<String>, _>("entry_regime")?
                    .and_then(|r| parse_regime(&r)),
            });
        }
        Ok(out)
    }

    pub async fn record_accuracy(
        &self,
        ts: DateTime<Utc>,
        score: u8,
        move_pct_30min: Option<f64>,
        predicted_direction: &str,
        actual_direction: Option<&str>,
        triggers: &[String],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO blowup_accuracy (ts, score, move_pct_30min, predicted_direction, actual_direction, triggers) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(ts.to_rfc3339())
        .bind(score as i64)
        .bind(move_pct_30min)
        .bind(predicted_direction)
        .bind(actual_direction)
        .bind(serde_json::to_string(triggers)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// (score, move_pct_30min) pairs used for the overall precision/recall figures.
    pub async fn accuracy_rows(&self) -> Result<Vec<(u8, Option<f64>)>> {
        let rows = sqlx::query("SELECT score, move_pct_30min FROM blowup_accuracy")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let score: i64 = r.get("score");
                let move_pct: Option<f64> = r.get("move_pct_30min");
                (score as u8, move_pct)
            })
            .collect())
    }

    pub async fn log_calibration(&self, date: chrono::NaiveDate, result: &CalibrationResult) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO calibration_log \
             (date, old_weights, new_weights, weight_delta, direction_accuracy, overall_precision, overall_recall, persisted, notes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(date.to_string())
        .bind(serde_json::to_string(&result.old_weights)?)
        .bind(serde_json::to_string(&result.new_weights)?)
        .bind(result.weight_delta)
        .bind(result.direction_accuracy)
        .bind(result.overall_precision)
        .bind(result.overall_recall)
        .bind(result.persisted)
        .bind(&result.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_direction(s: &str) -> Option<hydra_core::Direction> {
    match s {
        "Bullish" => Some(hydra_core::Direction::Bullish),
        "Bearish" => Some(hydra_core::Direction::Bearish),
        "Neutral" => Some(hydra_core::Direction::Neutral),
        _ => None,
    }
}

fn parse_regime(s: &str) -> Option<hydra_core::Regime> {
    match s {
        "RiskOn" => Some(hydra_core::Regime::RiskOn),
        "RiskOff" => Some(hydra_core::Regime::RiskOff),
        "Transition" => Some(hydra_core::Regime::Transition),
        "Unknown" => Some(hydra_core::Regime::Unknown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_feedback(id: &str) -> TradeFeedback {
        TradeFeedback {
            trade_id: id.to_string(),
            ticker: "SPY".to_string(),
            direction: "CALL".to_string(),
            mode: "BLOWUP".to_string(),
            entry_time: Utc::now(),
            exit_time: Some(Utc::now()),
            pnl_pct: Some(2.5),
            conviction: Some(20),
            entry_blowup_score: Some(72),
            entry_direction: Some(hydra_core::Direction::Bullish),
            entry_triggers: vec!["vix_inversion:0.50".to_string()],
            entry_regime: Some(hydra_core::Regime::RiskOn),
        }
    }

    #[tokio::test]
    async fn recording_same_trade_id_twice_is_idempotent() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let fb = sample_feedback("t1");
        assert!(store.record_feedback(&fb).await.unwrap());
        assert!(!store.record_feedback(&fb).await.unwrap());

        let rows = store.feedback_by_mode("BLOWUP").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn feedback_by_mode_is_case_insensitive() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let mut fb = sample_feedback("t2");
        fb.mode = "blowup".to_string();
        store.record_feedback(&fb).await.unwrap();
        let rows = store.feedback_by_mode("BLOWUP").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry_triggers, vec!["vix_inversion:0.50".to_string()]);
    }
}
