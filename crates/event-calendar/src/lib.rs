pub mod calendar;
pub mod detector;
pub mod history;
pub mod types;

pub use calendar::EventCalendar;
pub use detector::SurpriseDetector;
pub use history::HistoryStore;
pub use types::{EconomicEvent, EventSurprise, SurpriseDirection, SurpriseMagnitude};
