//! Per-session conversation state.
//!
//! A [`Session`] is created on the first message for an unknown identifier
//! and mutated in place on every turn. Mutation of the escalation fields is
//! reserved to the [`EscalationEngine`](crate::escalation::EscalationEngine);
//! callers only read them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ContactInfo, Turn};

/// What the session is currently waiting for.
///
/// Collecting email and collecting phone are mutually exclusive by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Answering,
    CollectingEmail,
    CollectingPhone,
}

/// Four-state view of a session's escalation concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationState {
    Answering,
    CollectingEmail,
    CollectingPhone,
    Escalated,
}

/// Conversation state for one session identifier.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    contact: ContactInfo,
    phase: Phase,
    escalated: bool,
    contact_recorded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            contact: ContactInfo::default(),
            phase: Phase::Answering,
            escalated: false,
            contact_recorded: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn awaiting_email(&self) -> bool {
        self.phase == Phase::CollectingEmail
    }

    pub fn awaiting_phone(&self) -> bool {
        self.phase == Phase::CollectingPhone
    }

    /// Sticky: once true, stays true for the session's lifetime.
    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    pub fn state(&self) -> EscalationState {
        match self.phase {
            Phase::CollectingEmail => EscalationState::CollectingEmail,
            Phase::CollectingPhone => EscalationState::CollectingPhone,
            Phase::Answering if self.escalated => EscalationState::Escalated,
            Phase::Answering => EscalationState::Answering,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fill unknown contact fields from an inbound request.
    pub fn merge_contact(&mut self, contact: &ContactInfo) {
        self.contact.merge_missing(contact);
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_email(&mut self, email: &str) {
        self.contact.email = Some(email.to_string());
    }

    pub(crate) fn set_phone(&mut self, phone: &str) {
        self.contact.phone = Some(phone.to_string());
    }

    pub(crate) fn mark_escalated(&mut self) {
        self.escalated = true;
    }

    /// Returns true the first time it is called while contact is complete.
    pub(crate) fn claim_contact_record(&mut self) -> bool {
        if self.contact_recorded || !self.contact.is_complete() {
            return false;
        }
        self.contact_recorded = true;
        true
    }
}
