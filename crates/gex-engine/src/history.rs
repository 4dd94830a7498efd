use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::types::GexSnapshot;

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

    pub async fn record(&self, snapshot: &GexSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO gex_history (ts, spot_price, total_gex, call_gex, put_gex, flip_point, flip_distance_pct, regime, charm_flow_per_hour, vanna_exposure, options_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(snapshot.timestamp.to_rfc3339())
        .bind(snapshot.spot_price)
        .bind(snapshot.total_gex)
        .bind(snapshot.call_gex)
        .bind(snapshot.put_gex)
        .bind(snapshot.flip_point)
        .bind(snapshot.flip_distance_pct)
        .bind(format!("{:?}", snapshot.regime))
        .bind(snapshot.charm_flow_per_hour)
        .bind(snapshot.vanna_exposure)
        .bind(snapshot.options_count as i64)
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
    use crate::types::GexSnapshot;
    use chrono::Utc;

    #[tokio::test]
    async fn records_a_row() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        store.record(&GexSnapshot::empty(Utc::now())).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gex_history")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
