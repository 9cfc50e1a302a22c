//! Chat-completion collaborator trait.
//!
//! The engine and dispatcher only need "messages in, text out"; the
//! HTTP client for OpenAI-compatible endpoints lives in the app crate.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Turn;

/// A chat-completion message in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.text.clone(),
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Identifier used in logs.
    fn model_name(&self) -> &str;
    /// Generate the assistant reply for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
