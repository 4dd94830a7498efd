use std::path::PathBuf;

/// Process-wide configuration, loaded once at startup from the environment
/// (via `dotenvy`, §10.3). Every field absent at startup degrades the owning
/// connector or subsystem to disabled/unhealthy rather than failing the
/// process — config validation never panics.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub weights_path: PathBuf,
    pub primary_ticker: String,

    pub fred_api_key: Option<String>,
    pub polygon_api_key: Option<String>,

    pub scorer_interval_secs: u64,
    pub classifier_market_hours_secs: u64,
    pub classifier_off_hours_secs: u64,
    pub dark_pool_market_hours_secs: u64,
    pub dark_pool_off_hours_secs: u64,
    pub gamma_min_interval_secs: u64,
    pub gamma_max_interval_secs: u64,
    pub inbound_bridge_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir = std::env::var("HYDRA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        Self {
            bind_addr: std::env::var("HYDRA_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            weights_path: data_dir.join("blowup_weights.json"),
            primary_ticker: std::env::var("HYDRA_PRIMARY_TICKER").unwrap_or_else(|_| "SPY".to_string()),
            data_dir,
            fred_api_key: std::env::var("FRED_API_KEY").ok(),
            polygon_api_key: std::env::var("POLYGON_API_KEY").ok(),
            scorer_interval_secs: env_u64("HYDRA_SCORER_INTERVAL_SECS", 60),
            classifier_market_hours_secs: env_u64("HYDRA_CLASSIFIER_MARKET_SECS", 120),
            classifier_off_hours_secs: env_u64("HYDRA_CLASSIFIER_OFF_SECS", 300),
            dark_pool_market_hours_secs: env_u64("HYDRA_DARKPOOL_MARKET_SECS", 300),
            dark_pool_off_hours_secs: env_u64("HYDRA_DARKPOOL_OFF_SECS", 900),
            gamma_min_interval_secs: env_u64("HYDRA_GAMMA_MIN_SECS", 30),
            gamma_max_interval_secs: env_u64("HYDRA_GAMMA_MAX_SECS", 900),
            inbound_bridge_enabled: std::env::var("HYDRA_INBOUND_BRIDGE_TOKEN").is_ok(),
        }
    }

    pub fn db_path(&self, file: &str) -> String {
        format!("sqlite://{}", self.data_dir.join(file).display())
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Whether `now` falls in 9:30-16:00 America/New_York on a weekday, used to
/// gate the flow-classifier and dark-pool workers' faster cadence.
pub fn is_market_hours(now: chrono::DateTime<chrono::Utc>) -> bool {
    use chrono::{Datelike, Timelike, TimeZone};
    use chrono_tz::America::New_York;

    let local = New_York.from_utc_datetime(&now.naive_utc());
    let weekday = local.weekday();
    if matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun) {
        return false;
    }
    let minutes = local.hour() * 60 + local.minute();
    (9 * 60 + 30..16 * 60).contains(&minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn market_hours_detects_weekday_session() {
        // 2025-01-07 is a Tuesday; 14:00 UTC = 9:00 ET (pre-market, not yet open)
        let pre_open = chrono::Utc.with_ymd_and_hms(2025, 1, 7, 14, 0, 0).unwrap();
        assert!(!is_market_hours(pre_open));

        // 15:00 UTC = 10:00 ET, inside the session
        let mid_session = chrono::Utc.with_ymd_and_hms(2025, 1, 7, 15, 0, 0).unwrap();
        assert!(is_market_hours(mid_session));
    }

    #[test]
    fn market_hours_excludes_weekends() {
        // 2025-01-11 is a Saturday
        let weekend = chrono::Utc.with_ymd_and_hms(2025, 1, 11, 15, 0, 0).unwrap();
        assert!(!is_market_hours(weekend));
    }
}
