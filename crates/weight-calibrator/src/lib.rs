pub mod calibrator;
pub mod history;
pub mod types;

pub use calibrator::WeightCalibrator;
pub use history::HistoryStore;
pub use types::{CalibrationOutcome, CalibrationResult, TradeStats, TriggerStats};
