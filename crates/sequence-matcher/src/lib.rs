pub mod history;
pub mod math;
pub mod matcher;
pub mod types;

pub use history::HistoryStore;
pub use matcher::SequenceMatcher;
pub use types::{ConvictionModifier, SequenceAnalysis, SequenceMatch, HISTORY_DAYS, TOP_K_CANDIDATES};
