use thiserror::Error;

#[derive(Error, Debug)]
pub enum BedrockError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Bedrock client not configured")]
    Unconfigured,

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BedrockResult<T> = Result<T, BedrockError>;
