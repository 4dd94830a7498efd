use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::types::{BedrockResponse, CLAUDE_HAIKU_MODEL, DEFAULT_REGION, EMBED_DIMENSIONS, NOVA_PRO_MODEL, TITAN_EMBED_MODEL};

/// Client for Amazon Bedrock AI models (Claude Haiku for fast classification,
/// Nova Pro for sequence analysis, Titan for embeddings).
///
/// Request signing is intentionally out of scope here — `endpoint` is expected
/// to front a signing proxy or a bedrock-runtime-compatible gateway. A real
/// SigV4 signer can be substituted later without touching callers.
#[derive(Clone)]
pub struct BedrockClient {
    http: reqwest::Client,
    region: String,
    access_key: Option<String>,
    secret_key: Option<String>,
    endpoint: String,
}

impl BedrockClient {
    pub fn new() -> Self {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();
        let endpoint = std::env::var("BEDROCK_ENDPOINT")
            .unwrap_or_else(|_| format!("https://bedrock-runtime.{region}.amazonaws.com"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self { http, region, access_key, secret_key, endpoint }
    }

    /// True once AWS credentials are present. Every call site must treat
    /// `false` as "fall back to the deterministic path", never as an error.
    pub fn is_available(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub async fn invoke_haiku(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> BedrockResponse {
        self.converse(CLAUDE_HAIKU_MODEL, prompt, system, max_tokens, temperature).await
    }

    pub async fn invoke_nova(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> BedrockResponse {
        self.converse(NOVA_PRO_MODEL, prompt, system, max_tokens, temperature).await
    }

    async fn converse(
        &self,
        model_id: &str,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> BedrockResponse {
        if !self.is_available() {
            return BedrockResponse::unavailable(model_id);
        }

        let start = Instant::now();

        let mut body = json!({
            "modelId": model_id,
            "messages": [{"role": "user", "content": [{"text": prompt}]}],
            "inferenceConfig": {"maxTokens": max_tokens, "temperature": temperature},
        });
        if let Some(system) = system {
            body["system"] = json!([{"text": system}]);
        }

        let url = format!("{}/model/{}/converse", self.endpoint, model_id);
        let result = self
            .http
            .post(&url)
            .bearer_auth(self.access_key.as_deref().unwrap_or_default())
            .json(&body)
            .send()
            .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(parsed) => parse_converse_response(model_id, &parsed, latency_ms),
                Err(e) => BedrockResponse::failed(model_id, latency_ms, e.to_string()),
            },
            Ok(resp) => {
                BedrockResponse::failed(model_id, latency_ms, format!("bedrock returned {}", resp.status()))
            }
            Err(e) => {
                tracing::warn!(model = model_id, error = %e, "bedrock invocation failed");
                BedrockResponse::failed(model_id, latency_ms, e.to_string())
            }
        }
    }

    /// Titan-style embedding at 512 dimensions. Returns `None` when Bedrock
    /// is unconfigured or the call fails — callers must have a statistical
    /// fallback and never block on this.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if !self.is_available() {
            return None;
        }

        let body = json!({
            "inputText": text,
            "dimensions": EMBED_DIMENSIONS,
            "normalize": true,
        });

        let url = format!("{}/model/{}/invoke", self.endpoint, TITAN_EMBED_MODEL);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.access_key.as_deref().unwrap_or_default())
            .json(&body)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        let parsed: Value = resp.json().await.ok()?;
        let embedding = parsed.get("embedding")?.as_array()?;
        Some(embedding.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
    }

    pub async fn batch_embeddings(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await);
        }
        out
    }
}

impl Default for BedrockClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_converse_response(model_id: &str, parsed: &Value, latency_ms: f64) -> BedrockResponse {
    let content = parsed
        .get("output")
        .and_then(|o| o.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
        .and_then(|blocks| blocks.first())
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string();

    let usage = parsed.get("usage");
    let input_tokens = usage.and_then(|u| u.get("inputTokens")).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let output_tokens = usage.and_then(|u| u.get("outputTokens")).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    BedrockResponse {
        success: true,
        content,
        model: model_id.to_string(),
        input_tokens,
        output_tokens,
        latency_ms: (latency_ms * 10.0).round() / 10.0,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_without_credentials() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        let client = BedrockClient::new();
        assert!(!client.is_available());
    }

    #[tokio::test]
    async fn haiku_call_degrades_gracefully_without_credentials() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        let client = BedrockClient::new();
        let response = client.invoke_haiku("test", None, 100, 0.0).await;
        assert!(!response.success);
        assert_eq!(response.model, CLAUDE_HAIKU_MODEL);
    }

    #[tokio::test]
    async fn embed_returns_none_without_credentials() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        let client = BedrockClient::new();
        assert!(client.embed("test text").await.is_none());
    }
}
