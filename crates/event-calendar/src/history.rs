use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::types::EventSurprise;

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

    pub async fn record(&self, surprise: &EventSurprise) -> Result<()> {
        sqlx::query(
            "INSERT INTO event_results (event_name, event_date, actual, consensus, previous, surprise_pct, direction, ts) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&surprise.event_name)
        .bind(surprise.timestamp.date_naive().to_string())
        .bind(surprise.actual)
        .bind(surprise.consensus)
        .bind(surprise.previous)
        .bind(surprise.surprise_pct)
        .bind(format!("{:?}", surprise.direction))
        .bind(surprise.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_spy_moves(&self, event_name: &str, event_date: &str, move_15min: f64, move_30min: f64) -> Result<()> {
        sqlx::query("UPDATE event_results SET spy_move_15min = ?, spy_move_30min = ? WHERE event_name = ? AND event_date = ?")
            .bind(move_15min)
            .bind(move_30min)
            .bind(event_name)
            .bind(event_date)
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
    use crate::types::{SurpriseDirection, SurpriseMagnitude};
    use chrono::Utc;

    fn sample_surprise() -> EventSurprise {
        EventSurprise {
            event_name: "Nonfarm Payrolls".to_string(),
            timestamp: Utc::now(),
            actual: 200.0,
            consensus: 150.0,
            previous: 143.0,
            surprise_pct: 0.33,
            surprise_std: 1.25,
            direction: SurpriseDirection::BetterThanExpected,
            magnitude: SurpriseMagnitude::Moderate,
            market_impact: "test".to_string(),
            trade_signals: vec![],
            confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn records_a_surprise() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        store.record(&sample_surprise()).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_results").fetch_one(store.pool()).await.unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn updates_spy_moves_after_recording() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let surprise = sample_surprise();
        let date = surprise.timestamp.date_naive().to_string();
        store.record(&surprise).await.unwrap();
        store.record_spy_moves(&surprise.event_name, &date, 0.4, 0.6).await.unwrap();

        let row: (f64, f64) =
            sqlx::query_as("SELECT spy_move_15min, spy_move_30min FROM event_results WHERE event_name = ?")
                .bind(&surprise.event_name)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(row, (0.4, 0.6));
    }
}
