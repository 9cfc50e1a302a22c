//! The chat turn pipeline.
//!
//! ```text
//! request ─▶ validate ─▶ checkout session ─▶ merge contact
//!         ─▶ engine.begin_turn ─┬─▶ resolved reply
//!                               └─▶ retrieve ─▶ complete ─▶ engine.finish_answer
//!         ─▶ snapshot ─▶ dispatcher (summary, record, notify) ─▶ reply
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use support_harness_core::completion::CompletionProvider;
use support_harness_core::escalation::{EscalationEngine, GeneratedAnswer, TurnPlan};
use support_harness_core::models::ContactInfo;
use support_harness_core::prompt::build_answer_messages;
use support_harness_core::retrieve::Retriever;

use crate::dispatch::Dispatcher;
use crate::sessions::SessionStore;

/// Reply used when the completion backend fails.
pub const GENERIC_ERROR_REPLY: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment.";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            email: None,
            phone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
}

pub struct ChatService {
    engine: EscalationEngine,
    sessions: Arc<dyn SessionStore>,
    retriever: Retriever,
    completion: Arc<dyn CompletionProvider>,
    dispatcher: Arc<Dispatcher>,
    business_name: String,
    top_k: usize,
}

impl ChatService {
    pub fn new(
        engine: EscalationEngine,
        sessions: Arc<dyn SessionStore>,
        retriever: Retriever,
        completion: Arc<dyn CompletionProvider>,
        dispatcher: Arc<Dispatcher>,
        business_name: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            engine,
            sessions,
            retriever,
            completion,
            dispatcher,
            business_name: business_name.into(),
            top_k,
        }
    }

    /// Process one user message and return the assistant's reply.
    ///
    /// Only a blank message or session id fails; collaborator failures
    /// degrade to a generic reply or an escalation.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let session_id = request.session_id.trim();
        if session_id.is_empty() {
            return Err(ChatError::Validation("session_id must not be empty".to_string()));
        }
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }

        let mut session = self.sessions.checkout(session_id).await;
        session.merge_contact(&ContactInfo {
            email: request.email.clone(),
            phone: request.phone.clone(),
        });

        let outcome = match self.engine.begin_turn(&mut session, message) {
            TurnPlan::Resolved(outcome) => outcome,
            TurnPlan::Generate => {
                let context = self.retriever.retrieve_context(message, self.top_k).await;
                let messages =
                    build_answer_messages(&self.business_name, &context, session.turns());
                let reply = match self.completion.complete(&messages).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(session_id, error = %e, "completion failed; sending generic reply");
                        GENERIC_ERROR_REPLY.to_string()
                    }
                };
                let answer = GeneratedAnswer {
                    reply,
                    context_empty: context.is_empty(),
                };
                self.engine.finish_answer(&mut session, message, answer)
            }
        };

        if outcome.escalated() {
            info!(session_id, "session escalated");
        }

        if !outcome.effects.is_empty() {
            let snapshot = (*session).clone();
            drop(session);
            self.dispatcher.run_all(&outcome.effects, &snapshot).await;
        }

        Ok(ChatReply {
            reply: outcome.reply,
        })
    }
}
