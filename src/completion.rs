//! Chat-completion clients.
//!
//! [`OpenAiCompatClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default). The bearer token is read
//! once from the environment variable named in `completion.api_key_env`;
//! a missing token fails each call rather than startup, so ingestion keeps
//! working on hosts without a key.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use support_harness_core::completion::{ChatMessage, CompletionProvider};

use crate::config::CompletionConfig;

pub struct OpenAiCompatClient {
    url: String,
    model: String,
    temperature: f32,
    api_key_env: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(
                env = %config.api_key_env,
                "completion API key not set; answers will fall back to the error reply"
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key_env: config.api_key_env.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} not configured", self.api_key_env))?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
                "temperature": self.temperature,
            }))
            .send()
            .await
            .map_err(|e| anyhow!("completion request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("completion endpoint returned {}: {}", status, body);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("completion response parse failed: {}", e))?;
        parse_completion_text(&payload)
    }
}

/// `choices[0].message.content`, trimmed; empty content is an error.
pub fn parse_completion_text(payload: &Value) -> Result<String> {
    let text = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if text.is_empty() {
        bail!("completion response had empty content");
    }
    Ok(text.to_string())
}

/// Completion provider that always fails; every answer becomes the
/// generic error reply.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionProvider for DisabledCompletion {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("Completion provider is disabled")
    }
}

pub fn create_completion_provider(config: &CompletionConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatClient::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledCompletion)),
        other => bail!("Unknown completion provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_text() {
        let payload = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Check-in is at 2pm. " } }]
        });
        assert_eq!(parse_completion_text(&payload).unwrap(), "Check-in is at 2pm.");
    }

    #[test]
    fn test_parse_completion_text_rejects_empty() {
        let payload = serde_json::json!({ "choices": [{ "message": { "content": "" } }] });
        assert!(parse_completion_text(&payload).is_err());
        assert!(parse_completion_text(&serde_json::json!({ "error": "x" })).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_per_call() {
        let cfg = CompletionConfig {
            api_key_env: "SUPPORT_HARNESS_TEST_UNSET_KEY".to_string(),
            ..CompletionConfig::default()
        };
        let client = OpenAiCompatClient::new(&cfg).unwrap();
        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("SUPPORT_HARNESS_TEST_UNSET_KEY"));
    }
}
