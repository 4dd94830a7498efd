use serde::{Deserialize, Serialize};

pub const CLAUDE_HAIKU_MODEL: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";
pub const NOVA_PRO_MODEL: &str = "amazon.nova-pro-v1:0";
pub const TITAN_EMBED_MODEL: &str = "amazon.titan-embed-text-v2:0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const EMBED_DIMENSIONS: usize = 512;

/// Standardized response from a Bedrock model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockResponse {
    pub success: bool,
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: f64,
    pub error: Option<String>,
}

impl BedrockResponse {
    pub fn unavailable(model: &str) -> Self {
        Self {
            success: false,
            content: String::new(),
            model: model.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            latency_ms: 0.0,
            error: Some("Bedrock client not configured".to_string()),
        }
    }

    pub fn failed(model: &str, latency_ms: f64, error: String) -> Self {
        Self {
            success: false,
            content: String::new(),
            model: model.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            latency_ms,
            error: Some(error),
        }
    }
}
