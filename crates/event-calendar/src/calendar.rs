use chrono::{DateTime, Utc};

use crate::types::EconomicEvent;

const SEED_EVENTS: &str = include_str!("../events.json");

#[derive(Clone)]
pub struct EventCalendar {
    events: Vec<EconomicEvent>,
}

impl EventCalendar {
    /// Loads the event list from `EVENT_CALENDAR_PATH` when set, falling
    /// back to the bundled seed file. A malformed override file degrades to
    /// the seed rather than erroring, per the subsystem-degraded contract.
    pub fn load() -> Self {
        let events = std::env::var("EVENT_CALENDAR_PATH")
            .ok()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|raw| serde_json::from_str::<Vec<EconomicEvent>>(&raw).ok())
            .or_else(|| serde_json::from_str::<Vec<EconomicEvent>>(SEED_EVENTS).ok())
            .unwrap_or_default();

        Self { events }
    }

    pub fn upcoming(&self, now: DateTime<Utc>, within_hours: i64) -> Vec<&EconomicEvent> {
        let cutoff = now + chrono::Duration::hours(within_hours);
        let mut upcoming: Vec<&EconomicEvent> =
            self.events.iter().filter(|e| e.scheduled_at() >= now && e.scheduled_at() <= cutoff).collect();
        upcoming.sort_by_key(|e| e.scheduled_at());
        upcoming
    }

    pub fn all(&self) -> &[EconomicEvent] {
        &self.events
    }

    pub fn impact_description(event: &EconomicEvent) -> &'static str {
        match event.category.as_str() {
            "labor" => "Strong data is hawkish for the Fed and risk-off. Weak data is dovish initially, then recession fears.",
            "inflation" => "Hot inflation is hawkish for the Fed, volatile for stocks. Cool inflation rallies risk assets.",
            "growth" => "Strong GDP is risk-on. Weak GDP raises recession fears but also rate-cut hopes.",
            "rates" => "A hawkish surprise is risk-off. A dovish surprise is a massive rally.",
            "manufacturing" => "Above 50 is expansionary and bullish for industrials. Below 50 is contractionary, defensive positioning.",
            _ => "Market-moving event.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_bundled_seed_events() {
        let calendar = EventCalendar::load();
        assert!(!calendar.all().is_empty());
        assert!(calendar.all().iter().any(|e| e.name == "Nonfarm Payrolls"));
    }

    #[test]
    fn upcoming_filters_by_window() {
        let calendar = EventCalendar::load();
        let far_future = chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let now = DateTime::from_naive_utc_and_offset(far_future, Utc) - chrono::Duration::hours(100_000);
        assert!(calendar.upcoming(now, 24 * 365 * 10).len() <= calendar.all().len());
    }
}
