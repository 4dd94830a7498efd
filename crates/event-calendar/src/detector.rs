use chrono::Utc;
use http_fetch::FetchClient;

use crate::history::HistoryStore;
use crate::types::{EconomicEvent, EventSurprise, SurpriseDirection, SurpriseMagnitude};

/// Historical standard deviation used to convert a raw surprise into a
/// surprise-std score, per event name. Falls back to 1.0 for unlisted events.
fn historical_stdev(event_name: &str) -> f64 {
    match event_name {
        "Nonfarm Payrolls" => 40.0,
        "CPI YoY" => 0.1,
        "Core CPI MoM" => 0.1,
        "Initial Jobless Claims" => 15.0,
        "GDP QoQ" => 0.3,
        "PCE Price Index YoY" => 0.1,
        "ISM Manufacturing PMI" => 1.5,
        "FOMC Rate Decision" => 0.25,
        _ => 1.0,
    }
}

pub struct SurpriseDetector {
    client: FetchClient,
    history: Option<HistoryStore>,
}

impl SurpriseDetector {
    pub fn new(client: FetchClient, history: Option<HistoryStore>) -> Self {
        Self { client, history }
    }

    /// Checks FRED for a fresh observation on `event.fred_series` and, if one
    /// is available, classifies the surprise against consensus. Returns
    /// `None` (not an error) whenever no FRED key is configured, the series
    /// is absent, or the series hasn't been released yet — callers poll
    /// again on the next tick.
    pub async fn check_for_release(&self, event: &EconomicEvent) -> Option<EventSurprise> {
        let series_id = event.fred_series.as_ref()?;
        let api_key = std::env::var("FRED_API_KEY").ok().filter(|k| !k.is_empty())?;

        let actual = self.fetch_fred_latest(series_id, &api_key).await?;

        let consensus = event.consensus.unwrap_or(0.0);
        let previous = event.previous.unwrap_or(0.0);

        let surprise_pct = if consensus != 0.0 { (actual - consensus) / consensus.abs() } else { 0.0 };

        let stdev = historical_stdev(&event.name);
        let surprise_std = if stdev > 0.0 { (actual - consensus) / stdev } else { 0.0 };

        let direction = classify_direction(event, actual, consensus);
        let magnitude = classify_magnitude(surprise_std.abs());
        let market_impact = generate_impact(event, direction, magnitude);
        let trade_signals = generate_trades(event, direction, magnitude);

        let surprise = EventSurprise {
            event_name: event.name.clone(),
            timestamp: Utc::now(),
            actual,
            consensus,
            previous,
            surprise_pct: (surprise_pct * 10000.0).round() / 10000.0,
            surprise_std: (surprise_std * 100.0).round() / 100.0,
            direction,
            magnitude,
            market_impact,
            trade_signals,
            confidence: 0.9,
        };

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&surprise).await {
                tracing::warn!(error = %e, "failed to persist event surprise");
            }
        }

        Some(surprise)
    }

    async fn fetch_fred_latest(&self, series_id: &str, api_key: &str) -> Option<f64> {
        let body = self
            .client
            .get_json(
                "https://api.stlouisfed.org/fred/series/observations",
                &[("series_id", series_id), ("api_key", api_key), ("file_type", "json"), ("sort_order", "desc"), ("limit", "1")],
            )
            .await?;

        let observation = body.get("observations")?.as_array()?.first()?;
        let value = observation.get("value")?.as_str()?;
        if value == "." {
            return None;
        }
        value.parse::<f64>().ok()
    }
}

fn classify_direction(event: &EconomicEvent, actual: f64, consensus: f64) -> SurpriseDirection {
    let diff = actual - consensus;
    let higher_is_worse = event.category == "inflation" || event.name.contains("Claims");

    if diff.abs() < 0.01 * consensus.abs() {
        SurpriseDirection::InLine
    } else if higher_is_worse {
        if diff > 0.0 {
            SurpriseDirection::WorseThanExpected
        } else {
            SurpriseDirection::BetterThanExpected
        }
    } else if diff > 0.0 {
        SurpriseDirection::BetterThanExpected
    } else {
        SurpriseDirection::WorseThanExpected
    }
}

fn classify_magnitude(abs_std: f64) -> SurpriseMagnitude {
    if abs_std >= 3.0 {
        SurpriseMagnitude::Massive
    } else if abs_std >= 2.0 {
        SurpriseMagnitude::Large
    } else if abs_std >= 1.0 {
        SurpriseMagnitude::Moderate
    } else {
        SurpriseMagnitude::Small
    }
}

fn generate_impact(event: &EconomicEvent, direction: SurpriseDirection, magnitude: SurpriseMagnitude) -> String {
    if magnitude == SurpriseMagnitude::Small || direction == SurpriseDirection::InLine {
        return format!("{} came in line with expectations. Minimal market impact expected.", event.name);
    }

    let base = match (event.category.as_str(), direction) {
        ("labor", SurpriseDirection::BetterThanExpected) => {
            "Strong labor data is hawkish for the Fed. Expect rates higher for longer, pressure on growth stocks."
        }
        ("labor", SurpriseDirection::WorseThanExpected) => {
            "Weak labor data raises recession fears but also rate-cut hopes. Watch for risk-off then risk-on."
        }
        ("inflation", SurpriseDirection::BetterThanExpected) => "Cooler inflation is dovish for the Fed. Risk assets rally, bonds bid.",
        ("inflation", SurpriseDirection::WorseThanExpected) => {
            "Hot inflation is hawkish for the Fed. Bonds sell off, stocks volatile, dollar strengthens."
        }
        ("growth", SurpriseDirection::BetterThanExpected) => "Strong growth is risk-on. Cyclicals outperform.",
        ("growth", SurpriseDirection::WorseThanExpected) => "Weak growth raises recession fears. Defensive positioning.",
        ("rates", SurpriseDirection::BetterThanExpected) => "A dovish Fed fuels a massive risk rally.",
        ("rates", SurpriseDirection::WorseThanExpected) => "A hawkish Fed drives risk-off, yields spike.",
        _ => "Surprise detected.",
    };

    match magnitude {
        SurpriseMagnitude::Massive => format!("MASSIVE SURPRISE: {base} Expect 1-2% moves in affected assets."),
        SurpriseMagnitude::Large => format!("LARGE SURPRISE: {base} Expect 0.5-1% moves."),
        _ => format!("MODERATE SURPRISE: {base}"),
    }
}

fn generate_trades(event: &EconomicEvent, direction: SurpriseDirection, magnitude: SurpriseMagnitude) -> Vec<String> {
    if magnitude == SurpriseMagnitude::Small || direction == SurpriseDirection::InLine {
        return vec!["data in line, fade any overreaction".to_string()];
    }

    let mut trades = match (event.category.as_str(), direction) {
        ("labor", SurpriseDirection::WorseThanExpected) => vec![
            "BUY TLT calls - rate cut expectations rise".to_string(),
            "SELL IWM - small caps most exposed to labor weakness".to_string(),
            "BUY GLD calls - safe haven plus lower rates".to_string(),
        ],
        ("labor", _) => vec!["SELL TLT - rates higher for longer".to_string(), "BUY XLF calls - banks benefit from higher rates".to_string()],
        ("inflation", SurpriseDirection::BetterThanExpected) => vec![
            "BUY QQQ calls - growth benefits from lower rates".to_string(),
            "BUY TLT calls - bonds rally on dovish Fed".to_string(),
            "BUY GLD - real rates decline".to_string(),
        ],
        ("inflation", _) => vec![
            "BUY TLT puts - yields spike on hot inflation".to_string(),
            "BUY DXY - dollar strengthens".to_string(),
            "SELL XLY - consumer discretionary hit".to_string(),
        ],
        ("rates", SurpriseDirection::BetterThanExpected) => vec![
            "BUY SPY calls - risk on".to_string(),
            "BUY QQQ calls - growth rallies".to_string(),
            "BUY IWM calls - small caps rip".to_string(),
        ],
        ("rates", _) => {
            vec!["BUY SPY puts - risk off".to_string(), "BUY TLT puts - yields spike".to_string(), "SELL growth stocks".to_string()]
        }
        _ => vec![],
    };

    if magnitude == SurpriseMagnitude::Massive {
        trades.insert(0, "PRIORITY: trade the first 15-minute candle direction".to_string());
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn labor_event() -> EconomicEvent {
        EconomicEvent {
            name: "Initial Jobless Claims".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
            time: chrono::NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            fred_series: Some("ICSA".to_string()),
            consensus: Some(215.0),
            previous: Some(219.0),
            unit: "K".to_string(),
            importance: "MEDIUM".to_string(),
            category: "labor".to_string(),
            assets_affected: vec!["SPY".to_string()],
        }
    }

    #[test]
    fn higher_claims_classified_as_worse() {
        let event = labor_event();
        assert_eq!(classify_direction(&event, 260.0, 215.0), SurpriseDirection::WorseThanExpected);
    }

    #[test]
    fn in_line_within_one_percent() {
        let event = labor_event();
        assert_eq!(classify_direction(&event, 215.5, 215.0), SurpriseDirection::InLine);
    }

    #[test]
    fn magnitude_scales_with_stdev() {
        assert_eq!(classify_magnitude(3.5), SurpriseMagnitude::Massive);
        assert_eq!(classify_magnitude(0.5), SurpriseMagnitude::Small);
    }

    #[tokio::test]
    async fn no_fred_key_yields_no_surprise() {
        std::env::remove_var("FRED_API_KEY");
        let detector = SurpriseDetector::new(FetchClient::new(std::time::Duration::from_secs(2)), None);
        assert!(detector.check_for_release(&labor_event()).await.is_none());
    }
}
