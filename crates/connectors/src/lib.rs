pub mod bookkeeping;
pub mod calendar;
pub mod crypto;
pub mod macro_data;
pub mod prediction;
pub mod quotes;
pub mod registry;
pub mod scrape;

pub use calendar::{EconomicCalendar, EventBand, ScheduledEvent};
pub use crypto::{BinanceFundingRate, BinanceOpenInterest, CoinGlassLiquidations};
pub use macro_data::FredConnector;
pub use prediction::PolymarketMonitor;
pub use quotes::{CboeVixMonitor, CreditSpreadMonitor, DxyMonitor, SkewIndexMonitor};
pub use registry::data_source_registry;
pub use scrape::{GitHubAiMonitor, HackerNewsMonitor};
