pub mod aggregate;
pub mod decoder;
pub mod history;
pub mod types;

pub use decoder::FlowDecoder;
pub use history::HistoryStore;
pub use types::{FlowSnapshot, InstitutionalBias};
