pub mod client;
pub mod error;
pub mod types;

pub use client::BedrockClient;
pub use error::{BedrockError, BedrockResult};
pub use types::{BedrockResponse, CLAUDE_HAIKU_MODEL, NOVA_PRO_MODEL, TITAN_EMBED_MODEL};
