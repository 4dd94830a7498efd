pub mod aggregator;
pub mod models;

pub use aggregator::IntelligenceAggregator;
pub use models::{ConvictionBreakdown, IntelligenceSnapshot};
