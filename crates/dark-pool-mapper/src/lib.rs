pub mod history;
pub mod mapper;
pub mod math;
pub mod types;

pub use history::HistoryStore;
pub use mapper::DarkPoolMapper;
pub use types::{DarkPoolLevel, DarkPoolSnapshot, LevelStrength, Side};
