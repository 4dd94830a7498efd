use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::types::FlowSnapshot;

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

    pub async fn record(&self, snapshot: &FlowSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO flow_history (ts, ticker, net_premium_calls, net_premium_puts, institutional_bias, confidence, haiku_analysis) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(snapshot.timestamp.to_rfc3339())
        .bind(&snapshot.ticker)
        .bind(snapshot.net_premium_calls)
        .bind(snapshot.net_premium_puts)
        .bind(format!("{:?}", snapshot.institutional_bias))
        .bind(snapshot.confidence)
        .bind(&snapshot.haiku_analysis)
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
    use chrono::Utc;

    #[tokio::test]
    async fn records_a_row() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        store.record(&FlowSnapshot::empty(Utc::now(), "SPY")).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM flow_history").fetch_one(store.pool()).await.unwrap();
        assert_eq!(count.0, 1);
    }
}
