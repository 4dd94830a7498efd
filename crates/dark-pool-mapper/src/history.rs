use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::types::DarkPoolSnapshot;

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

    pub async fn record(&self, snapshot: &DarkPoolSnapshot) -> Result<()> {
        let date = snapshot.timestamp.format("%Y-%m-%d").to_string();

        for level in &snapshot.levels {
            sqlx::query(
                "INSERT INTO dark_pool_levels (date, ticker, price_level, total_volume, total_notional, trade_count, buy_volume, sell_volume, strength) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(date, ticker, price_level) DO UPDATE SET \
                   total_volume = excluded.total_volume, total_notional = excluded.total_notional, \
                   trade_count = excluded.trade_count, strength = excluded.strength",
            )
            .bind(&date)
            .bind(&snapshot.ticker)
            .bind(level.price)
            .bind(level.volume)
            .bind(level.notional)
            .bind(level.trade_count as i64)
            .bind(0i64)
            .bind(0i64)
            .bind(format!("{:?}", level.strength))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LevelStrength, Side};
    use chrono::Utc;

    #[tokio::test]
    async fn records_levels_for_a_snapshot() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let mut snapshot = DarkPoolSnapshot::empty(Utc::now(), "SPY");
        snapshot.levels.push(crate::types::DarkPoolLevel {
            price: 450.0,
            volume: 10_000.0,
            notional: 4_500_000.0,
            trade_count: 3,
            side: Side::Buy,
            strength: LevelStrength::Medium,
        });
        store.record(&snapshot).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dark_pool_levels").fetch_one(store.pool()).await.unwrap();
        assert_eq!(count.0, 1);
    }
}
