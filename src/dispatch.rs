//! Executes the side effects requested by the escalation engine.
//!
//! Runs after a turn is resolved, against a snapshot of the session. Nothing
//! here can fail a turn: every error is logged and swallowed, and the
//! session's escalated flag has already been set by the engine.

use std::sync::Arc;

use tracing::{error, info, warn};

use support_harness_core::completion::CompletionProvider;
use support_harness_core::escalation::Effect;
use support_harness_core::models::{EscalationReason, EscalationRecord};
use support_harness_core::prompt::{
    fallback_summary, render_transcript, summary_messages, TRANSCRIPT_MAX_CHARS,
};
use support_harness_core::session::Session;

use crate::notify::{Notification, Notifier};
use crate::records::RecordStore;

pub struct Dispatcher {
    completion: Arc<dyn CompletionProvider>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            completion,
            records,
            notifier,
        }
    }

    /// Run every effect in order.
    pub async fn run_all(&self, effects: &[Effect], session: &Session) {
        for effect in effects {
            self.run(*effect, session).await;
        }
    }

    pub async fn run(&self, effect: Effect, session: &Session) {
        let transcript = render_transcript(session.turns(), TRANSCRIPT_MAX_CHARS);
        let summary = self.summarize(&transcript, session.id()).await;
        let contact = session.contact().clone();

        let reason = match effect {
            Effect::Escalate { reason } => reason,
            Effect::RecordContact => EscalationReason::ContactCompleted,
        };

        let record = EscalationRecord {
            timestamp: chrono::Utc::now(),
            session_id: session.id().to_string(),
            reason,
            summary: summary.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
        };
        match self.records.append(&record).await {
            Ok(id) => info!(session_id = %session.id(), record_id = id, %reason, "record saved"),
            Err(e) => error!(session_id = %session.id(), error = %e, "failed to save record"),
        }

        if let Effect::Escalate { .. } = effect {
            let notification = Notification {
                session_id: session.id().to_string(),
                reason,
                summary,
                transcript,
                contact,
            };
            if let Err(e) = self.notifier.notify(&notification).await {
                error!(session_id = %session.id(), error = %e, "failed to send notification");
            }
        }
    }

    async fn summarize(&self, transcript: &str, session_id: &str) -> String {
        match self.completion.complete(&summary_messages(transcript)).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                warn!(session_id, "summary was blank; using transcript head");
                fallback_summary(transcript)
            }
            Err(e) => {
                error!(session_id, error = %e, "summarization failed; using transcript head");
                fallback_summary(transcript)
            }
        }
    }
}
