//! Prompt and transcript construction.

use crate::completion::ChatMessage;
use crate::models::{RetrievedChunk, Turn};
use crate::normalize::truncate_chars;

/// Transcript cap, in characters, applied before summarization.
pub const TRANSCRIPT_MAX_CHARS: usize = 5000;
/// Length of the fallback summary used when summarization fails.
pub const SUMMARY_FALLBACK_CHARS: usize = 500;

const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation briefly and clearly.";

/// System prompt grounding the answer in retrieved context.
pub fn system_prompt(business_name: &str, context: &[RetrievedChunk]) -> String {
    let context_text = context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a helpful customer service chatbot for {}. \
         Use the following context to answer accurately:\n\n\
         {}\n\n\
         Be polite and informative. Do not redirect users to the website.",
        business_name, context_text
    )
}

/// System prompt followed by the full session history.
pub fn build_answer_messages(
    business_name: &str,
    context: &[RetrievedChunk],
    history: &[Turn],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system_prompt(business_name, context)));
    messages.extend(history.iter().map(ChatMessage::from));
    messages
}

/// Render `turns` as `"User: …\nAssistant: …"`, truncated to `max_chars`.
pub fn render_transcript(turns: &[Turn], max_chars: usize) -> String {
    let full = turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&full, max_chars).to_string()
}

pub fn summary_messages(transcript: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_INSTRUCTION),
        ChatMessage::user(transcript),
    ]
}

/// Summary used when the completion backend fails or returns nothing.
pub fn fallback_summary(transcript: &str) -> String {
    let head = truncate_chars(transcript, SUMMARY_FALLBACK_CHARS).trim();
    if head.is_empty() {
        "(empty conversation)".to_string()
    } else {
        head.to_string()
    }
}
