use anyhow::Result;
use hydra_core::BlowupResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Durable log of scorer ticks, one row each, plus a second table for realized
/// 30-minute move accuracy fed by whatever subsystem observes it.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

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

    pub async fn record(&self, result: &BlowupResult) -> Result<()> {
        let triggers = serde_json::to_string(&result.triggers)?;
        let components = serde_json::to_string(&result.components)?;

        sqlx::query(
            "INSERT INTO blowup_history (ts, probability, direction, regime, confidence, triggers, recommendation, components) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(result.timestamp.to_rfc3339())
        .bind(result.probability as i64)
        .bind(format!("{:?}", result.direction))
        .bind(format!("{:?}", result.regime))
        .bind(result.confidence)
        .bind(triggers)
        .bind(format!("{:?}", result.recommendation))
        .bind(components)
        .execute(&self.pool)
        .await?;

        Ok(())
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

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_and_count_rows() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let result = BlowupResult {
            probability: 42,
            direction: hydra_core::Direction::Neutral,
            regime: hydra_core::Regime::Unknown,
            confidence: 0.875,
            triggers: vec!["vix_inversion:0.50".to_string()],
            recommendation: hydra_core::Recommendation::ScalpOnly,
            events_next_30min: vec![],
            timestamp: chrono::Utc::now(),
            components: vec![],
        };
        store.record(&result).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blowup_history")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
