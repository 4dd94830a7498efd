use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EconomicEvent {
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub fred_series: Option<String>,
    pub consensus: Option<f64>,
    pub previous: Option<f64>,
    pub unit: String,
    pub importance: String,
    pub category: String,
    pub assets_affected: Vec<String>,
}

impl EconomicEvent {
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.date.and_time(self.time), Utc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurpriseDirection {
    BetterThanExpected,
    WorseThanExpected,
    InLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurpriseMagnitude {
    Small,
    Moderate,
    Large,
    Massive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSurprise {
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    pub actual: f64,
    pub consensus: f64,
    pub previous: f64,
    pub surprise_pct: f64,
    pub surprise_std: f64,
    pub direction: SurpriseDirection,
    pub magnitude: SurpriseMagnitude,
    pub market_impact: String,
    pub trade_signals: Vec<String>,
    pub confidence: f64,
}
