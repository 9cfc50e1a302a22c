//! Core data models used throughout Support Harness.
//!
//! These types represent the conversation turns, contact details, knowledge
//! chunks, and escalation records that flow through the chat and ingestion
//! pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used in chat-completion payloads (`"user"` / `"assistant"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized label used in transcripts (`"User"` / `"Assistant"`).
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Contact details collected from a user, populated incrementally.
///
/// Values are stored verbatim; no format validation is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    /// True when both email and phone are known.
    pub fn is_complete(&self) -> bool {
        self.email.is_some() && self.phone.is_some()
    }

    /// Fill unknown fields from `other`. Known fields are never overwritten,
    /// and blank values are ignored.
    pub fn merge_missing(&mut self, other: &ContactInfo) {
        if self.email.is_none() {
            self.email = non_blank(other.email.as_deref());
        }
        if self.phone.is_none() {
            self.phone = non_blank(other.phone.as_deref());
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Provenance attached to every chunk of an ingested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// `"website"` for scraped content, otherwise the uploaded filename or
    /// caller-supplied tag.
    pub source: String,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn website() -> Self {
        Self::new(WEBSITE_SOURCE)
    }
}

/// Source tag used for scraped website content.
pub const WEBSITE_SOURCE: &str = "website";

/// A contiguous slice of normalized source text prepared for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 hex of `text`.
    pub hash: String,
    pub metadata: ChunkMetadata,
}

/// A chunk returned from the retriever, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// Why an escalation record was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// The user asked for a human and contact collection finished.
    UserRequest,
    /// The generated reply contained a low-confidence marker.
    LowConfidence,
    /// The user's message signalled intent to transact (e.g. "book").
    TransactionIntent,
    /// Retrieval found no context for the question.
    NoContext,
    /// Both contact fields became known without an escalation.
    ContactCompleted,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::UserRequest => "user_request",
            EscalationReason::LowConfidence => "low_confidence",
            EscalationReason::TransactionIntent => "transaction_intent",
            EscalationReason::NoContext => "no_context",
            EscalationReason::ContactCompleted => "contact_completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user_request" => Some(EscalationReason::UserRequest),
            "low_confidence" => Some(EscalationReason::LowConfidence),
            "transaction_intent" => Some(EscalationReason::TransactionIntent),
            "no_context" => Some(EscalationReason::NoContext),
            "contact_completed" => Some(EscalationReason::ContactCompleted),
            _ => None,
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only row describing an escalation or completed contact capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub reason: EscalationReason,
    pub summary: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}
