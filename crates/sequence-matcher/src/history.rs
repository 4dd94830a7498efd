use anyhow::Result;
use chrono::{NaiveDate, Utc};
use hydra_core::Fingerprint;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::types::HISTORY_DAYS;

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

    pub async fn record(&self, fp: &Fingerprint) -> Result<()> {
        let embedding = fp.embedding.as_ref().map(|e| serde_json::to_string(e)).transpose()?;

        sqlx::query(
            "INSERT INTO daily_fingerprints \
             (date, gex_regime, flow_bias, dark_pool_bias, vix_level, spy_change_pct, spy_range_pct, blowup_score, outcome_next_day, embedding) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(date) DO UPDATE SET \
               gex_regime = excluded.gex_regime, flow_bias = excluded.flow_bias, dark_pool_bias = excluded.dark_pool_bias, \
               vix_level = excluded.vix_level, spy_change_pct = excluded.spy_change_pct, spy_range_pct = excluded.spy_range_pct, \
               blowup_score = excluded.blowup_score, outcome_next_day = excluded.outcome_next_day, embedding = excluded.embedding",
        )
        .bind(fp.date.to_string())
        .bind(&fp.gex_regime)
        .bind(&fp.flow_bias)
        .bind(&fp.dark_pool_bias)
        .bind(fp.vix)
        .bind(fp.spy_change_pct)
        .bind(fp.spy_range_pct)
        .bind(fp.blowup_score as i64)
        .bind(fp.outcome)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_outcome(&self, date: NaiveDate, outcome: f64) -> Result<()> {
        sqlx::query("UPDATE daily_fingerprints SET outcome_next_day = ? WHERE date = ?")
            .bind(outcome)
            .bind(date.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_recent(&self, days: i64) -> Result<Vec<Fingerprint>> {
        let cutoff = (Utc::now().date_naive() - chrono::Duration::days(days)).to_string();

        let rows = sqlx::query(
            "SELECT date, gex_regime, flow_bias, dark_pool_bias, vix_level, spy_change_pct, spy_range_pct, \
                    blowup_score, outcome_next_day, embedding \
             FROM daily_fingerprints WHERE date >= ? ORDER BY date DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let date_str: String = row.try_get("date")?;
            let embedding_str: Option<String> = row.try_get("embedding")?;
            let embedding = embedding_str.and_then(|s| serde_json::from_str(&s).ok());

            out.push(Fingerprint {
                date: NaiveDate::from_str(&date_str).unwrap_or_else(|_| Utc::now().date_naive()),
                gex_regime: row.try_get("gex_regime")?,
                flow_bias: row.try_get("flow_bias")?,
                dark_pool_bias: row.try_get("dark_pool_bias")?,
                vix: row.try_get("vix_level")?,
                spy_change_pct: row.try_get("spy_change_pct")?,
                spy_range_pct: row.try_get("spy_range_pct")?,
                blowup_score: row.try_get::<i64, _>("blowup_score")? as u8,
                outcome: row.try_get("outcome_next_day")?,
                embedding,
            });
        }

        Ok(out)
    }

    pub async fn load_history(&self) -> Result<Vec<Fingerprint>> {
        self.load_recent(HISTORY_DAYS).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fp(date: NaiveDate) -> Fingerprint {
        Fingerprint {
            date,
            gex_regime: "NEGATIVE".to_string(),
            flow_bias: "AGGRESSIVELY_BULLISH".to_string(),
            dark_pool_bias: "BUY".to_string(),
            vix: 19.5,
            spy_change_pct: 1.2,
            spy_range_pct: 1.5,
            blowup_score: 35,
            outcome: Some(0.8),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn records_and_loads_a_fingerprint() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let date = Utc::now().date_naive();
        store.record(&sample_fp(date)).await.unwrap();

        let loaded = store.load_history().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].gex_regime, "NEGATIVE");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_date() {
        let store = HistoryStore::new("sqlite::memory:").await.unwrap();
        let date = Utc::now().date_naive();
        store.record(&sample_fp(date)).await.unwrap();
        let mut updated = sample_fp(date);
        updated.vix = 25.0;
        store.record(&updated).await.unwrap();

        let loaded = store.load_history().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].vix, 25.0);
    }
}
