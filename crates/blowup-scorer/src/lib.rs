pub mod fetchers;
pub mod history;
pub mod scorer;

pub use history::HistoryStore;
pub use scorer::Scorer;
