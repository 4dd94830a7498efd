//! Scheduled-event calendar connector: the FUTURE -> PRE -> IMMINENT -> LIVE -> RECENT
//! -> GONE band state machine. Events are config-supplied, never hardcoded dates —
//! see the calibration note on this in the crate's top-level design ledger.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use serde::{Deserialize, Serialize};

use crate::bookkeeping::PollBookkeeping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBand {
    Future,
    Pre,
    Imminent,
    Live,
    Recent,
    Gone,
}

/// A single scheduled macro release (NFP, CPI, FOMC, GDP, PCE, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub name: String,
    pub at: DateTime<Utc>,
    pub affected_symbols: Vec<String>,
}

impl ScheduledEvent {
    pub fn band(&self, now: DateTime<Utc>) -> EventBand {
        let delta = self.at - now;
        if delta > Duration::hours(24) {
            EventBand::Future
        } else if delta > Duration::hours(2) {
            EventBand::Pre
        } else if delta >= Duration::minutes(-30) {
            EventBand::Imminent
        } else if delta >= Duration::hours(-2) {
            EventBand::Recent
        } else {
            EventBand::Gone
        }
        .refine_live(delta)
    }
}

trait RefineLive {
    fn refine_live(self, delta: Duration) -> EventBand;
}

impl RefineLive for EventBand {
    /// LIVE is the +-30 minute window straddling the event; IMMINENT/Recent above
    /// fold that window in above, this narrows it precisely.
    fn refine_live(self, delta: Duration) -> EventBand {
        if delta >= Duration::minutes(-30) && delta <= Duration::minutes(30) {
            EventBand::Live
        } else {
            self
        }
    }
}

/// Strength emitted per band: only PRE/IMMINENT/LIVE emit; RECENT/GONE are silent.
fn band_strength(band: EventBand) -> Option<f64> {
    match band {
        EventBand::Live => Some(1.0),
        EventBand::Imminent => Some(0.5),
        EventBand::Pre => Some(0.2),
        EventBand::Future | EventBand::Recent | EventBand::Gone => None,
    }
}

pub struct EconomicCalendar {
    events: Vec<ScheduledEvent>,
    bookkeeping: PollBookkeeping,
}

impl EconomicCalendar {
    pub fn new(events: Vec<ScheduledEvent>) -> Self {
        Self {
            events,
            bookkeeping: PollBookkeeping::default(),
        }
    }

    /// Events within the next 30 minutes, used by the scorer's `events_next_30min`.
    pub fn upcoming_within(&self, now: DateTime<Utc>, minutes: i64) -> Vec<&ScheduledEvent> {
        self.events
            .iter()
            .filter(|e| {
                let delta = e.at - now;
                delta >= Duration::zero() && delta <= Duration::minutes(minutes)
            })
            .collect()
    }
}

#[async_trait]
impl Connector for EconomicCalendar {
    fn name(&self) -> &str {
        "economic_calendar"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Macro
    }
    fn poll_interval_minutes(&self) -> i64 {
        5
    }
    fn reliability(&self) -> f64 {
        0.95
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        self.bookkeeping.record_success();
        let now = Utc::now();
        self.events
            .iter()
            .filter_map(|event| {
                let band = event.band(now);
                let strength = band_strength(band)?;
                Some(Signal {
                    id: Signal::stable_id("economic_calendar", &[&event.name, &event.at.to_rfc3339()]),
                    name: event.name.clone(),
                    source: "economic_calendar".to_string(),
                    category: SignalCategory::Macro,
                    priority: if matches!(band, EventBand::Live) {
                        SignalPriority::Critical
                    } else {
                        SignalPriority::Medium
                    },
                    direction: 0.0,
                    strength,
                    description: format!("{} at {}", event.name, event.at.to_rfc3339()),
                    affected_symbols: event.affected_symbols.clone(),
                    trade_hints: vec![],
                    raw_data: std::collections::HashMap::new(),
                    detected_at: now,
                    ttl_hours: 0.5,
                    reliability: self.reliability(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(offset: Duration) -> ScheduledEvent {
        ScheduledEvent {
            name: "NFP".to_string(),
            at: Utc::now() + offset,
            affected_symbols: vec!["SPY".to_string()],
        }
    }

    #[test]
    fn band_thirty_minutes_out_is_live() {
        let e = event_at(Duration::minutes(29));
        assert_eq!(e.band(Utc::now()), EventBand::Live);
    }

    #[test]
    fn band_two_hours_out_is_pre() {
        let e = event_at(Duration::hours(2) + Duration::minutes(1));
        assert_eq!(e.band(Utc::now()), EventBand::Pre);
    }

    #[test]
    fn band_past_two_hours_is_gone() {
        let e = event_at(-Duration::hours(3));
        assert_eq!(e.band(Utc::now()), EventBand::Gone);
    }

    #[test]
    fn recent_and_gone_emit_nothing() {
        assert_eq!(band_strength(EventBand::Recent), None);
        assert_eq!(band_strength(EventBand::Gone), None);
        assert_eq!(band_strength(EventBand::Live), Some(1.0));
    }
}
