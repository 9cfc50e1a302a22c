//! Escalation decision engine.
//!
//! Decides, per incoming user turn, whether to keep collecting contact
//! details, hand the conversation to a human, or answer automatically.
//!
//! The engine is pure: it mutates the [`Session`] it is given and returns
//! [`Effect`]s describing side effects (summary, record write, notification)
//! for the caller to execute. It never performs I/O, so every transition is
//! testable without network collaborators.
//!
//! # Turn protocol
//!
//! ```text
//! begin_turn(session, msg) ──▶ TurnPlan::Resolved(outcome)      (contact flow, trigger)
//!                          └─▶ TurnPlan::Generate
//!                                 │ caller: retrieve context, call completion
//!                                 ▼
//!                  finish_answer(session, msg, GeneratedAnswer) ──▶ TurnOutcome
//! ```
//!
//! # Priority order
//!
//! 1. Collecting email: store the text verbatim as email, ask for phone.
//! 2. Collecting phone: store the text verbatim as phone, escalate.
//! 3. Human-request trigger (not yet escalated): collect the missing contact
//!    field, or escalate directly when both are known.
//! 4. Otherwise answer; after generation a post-hoc check escalates on a
//!    low-confidence marker in the reply, a transaction keyword in the
//!    message, or empty retrieved context.
//!
//! An escalated session keeps receiving automated answers, but escalation
//! triggers never fire for it again.

use serde::Deserialize;

use crate::models::{EscalationReason, Turn};
use crate::session::{Phase, Session};

/// A side effect requested by a transition, executed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Summarize the session, persist a record, and notify a human.
    Escalate { reason: EscalationReason },
    /// Both contact fields became known without escalating; persist a record.
    RecordContact,
}

/// Final reply for a turn plus the effects to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub effects: Vec<Effect>,
}

impl TurnOutcome {
    pub fn escalated(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::Escalate { .. }))
    }
}

/// Result of [`EscalationEngine::begin_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPlan {
    /// The turn is complete; no generation needed.
    Resolved(TurnOutcome),
    /// Retrieve context, generate a reply, then call
    /// [`EscalationEngine::finish_answer`].
    Generate,
}

/// Output of the answering branch, fed back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub reply: String,
    /// True when retrieval returned no chunks.
    pub context_empty: bool,
}

/// User-facing reply texts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplyTexts {
    pub ask_email: String,
    pub ask_phone: String,
    pub ask_phone_after_email: String,
    pub escalated: String,
    pub escalated_after_contact: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            ask_email: "I can connect you to a human agent. First, please provide your email."
                .to_string(),
            ask_phone: "I can connect you to a human agent. Could you provide your phone number?"
                .to_string(),
            ask_phone_after_email:
                "Got your email. Could you please provide your phone number too?".to_string(),
            escalated: "I've escalated this to a human agent. You'll be contacted shortly."
                .to_string(),
            escalated_after_contact:
                "Thanks! I've escalated this to a human agent. You'll be contacted shortly."
                    .to_string(),
        }
    }
}

/// Phrase sets and replies driving the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EscalationPolicy {
    /// Substrings (case-insensitive) in a user message that request a human.
    pub human_triggers: Vec<String>,
    /// Substrings (case-insensitive) in a generated reply that signal low confidence.
    pub low_confidence_markers: Vec<String>,
    /// Substrings (case-insensitive) in a user message that signal intent to transact.
    pub transaction_keywords: Vec<String>,
    pub replies: ReplyTexts,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            human_triggers: [
                "talk to a person",
                "human agent",
                "real person",
                "speak to someone",
                "contact support",
                "talk to a human",
                "connect me",
                "contact an employee",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            low_confidence_markers: vec![
                "I'm not sure".to_string(),
                "I don't have that information".to_string(),
            ],
            transaction_keywords: vec!["book".to_string()],
            replies: ReplyTexts::default(),
        }
    }
}

/// Lowercase and fold typographic apostrophes so `I’m` matches `I'm`.
fn fold(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = fold(haystack);
    needles
        .iter()
        .map(|n| fold(n.trim()))
        .any(|n| !n.is_empty() && haystack.contains(&n))
}

/// Deterministic per-session state machine.
#[derive(Debug, Clone, Default)]
pub struct EscalationEngine {
    policy: EscalationPolicy,
}

impl EscalationEngine {
    pub fn new(policy: EscalationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// True when `message` contains a human-request trigger phrase.
    pub fn wants_human(&self, message: &str) -> bool {
        contains_any(message, &self.policy.human_triggers)
    }

    /// Append the user turn and resolve it when no generation is needed.
    pub fn begin_turn(&self, session: &mut Session, message: &str) -> TurnPlan {
        session.push_turn(Turn::user(message));
        let replies = &self.policy.replies;

        match session.phase() {
            Phase::CollectingEmail => {
                session.set_email(message);
                session.set_phase(Phase::CollectingPhone);
                let reply = replies.ask_phone_after_email.clone();
                return TurnPlan::Resolved(self.resolve(session, reply, Vec::new()));
            }
            Phase::CollectingPhone => {
                session.set_phone(message);
                session.set_phase(Phase::Answering);
                session.mark_escalated();
                let effects = vec![Effect::Escalate {
                    reason: EscalationReason::UserRequest,
                }];
                let reply = replies.escalated_after_contact.clone();
                return TurnPlan::Resolved(self.resolve(session, reply, effects));
            }
            Phase::Answering => {}
        }

        if !session.is_escalated() && self.wants_human(message) {
            let outcome = if session.contact().email.is_none() {
                session.set_phase(Phase::CollectingEmail);
                self.resolve(session, replies.ask_email.clone(), Vec::new())
            } else if session.contact().phone.is_none() {
                session.set_phase(Phase::CollectingPhone);
                self.resolve(session, replies.ask_phone.clone(), Vec::new())
            } else {
                session.mark_escalated();
                let effects = vec![Effect::Escalate {
                    reason: EscalationReason::UserRequest,
                }];
                self.resolve(session, replies.escalated.clone(), effects)
            };
            return TurnPlan::Resolved(outcome);
        }

        TurnPlan::Generate
    }

    /// Apply the post-hoc escalation check to a generated reply and finish
    /// the turn.
    pub fn finish_answer(
        &self,
        session: &mut Session,
        message: &str,
        answer: GeneratedAnswer,
    ) -> TurnOutcome {
        let mut reply = answer.reply;
        let mut effects = Vec::new();

        if !session.is_escalated() {
            if let Some(reason) = self.post_hoc_reason(message, &reply, answer.context_empty) {
                session.mark_escalated();
                effects.push(Effect::Escalate { reason });
                reply = self.policy.replies.escalated.clone();
            }
        }

        self.resolve(session, reply, effects)
    }

    /// First matching post-hoc escalation reason, if any.
    pub fn post_hoc_reason(
        &self,
        message: &str,
        reply: &str,
        context_empty: bool,
    ) -> Option<EscalationReason> {
        if contains_any(reply, &self.policy.low_confidence_markers) {
            Some(EscalationReason::LowConfidence)
        } else if contains_any(message, &self.policy.transaction_keywords) {
            Some(EscalationReason::TransactionIntent)
        } else if context_empty {
            Some(EscalationReason::NoContext)
        } else {
            None
        }
    }

    fn resolve(&self, session: &mut Session, reply: String, mut effects: Vec<Effect>) -> TurnOutcome {
        session.push_turn(Turn::assistant(reply.clone()));

        // An escalation record already carries the contact fields.
        let escalating = effects
            .iter()
            .any(|e| matches!(e, Effect::Escalate { .. }));
        if session.claim_contact_record() && !escalating {
            effects.push(Effect::RecordContact);
        }

        TurnOutcome { reply, effects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactInfo, Role};
    use crate::session::EscalationState;

    fn engine() -> EscalationEngine {
        EscalationEngine::default()
    }

    fn answer(reply: &str, context_empty: bool) -> GeneratedAnswer {
        GeneratedAnswer {
            reply: reply.to_string(),
            context_empty,
        }
    }

    fn resolved(plan: TurnPlan) -> TurnOutcome {
        match plan {
            TurnPlan::Resolved(outcome) => outcome,
            TurnPlan::Generate => panic!("expected a resolved turn"),
        }
    }

    fn assert_invariants(session: &Session) {
        assert!(!(session.awaiting_email() && session.awaiting_phone()));
    }

    #[test]
    fn test_trigger_with_unknown_email_asks_for_email() {
        let e = engine();
        let mut s = Session::new("s1");
        let out = resolved(e.begin_turn(&mut s, "Can I talk to a HUMAN please"));
        assert_eq!(s.state(), EscalationState::CollectingEmail);
        assert!(out.reply.to_lowercase().contains("email"));
        assert!(!out.reply.to_lowercase().contains("phone"));
        assert!(out.effects.is_empty());
        assert_invariants(&s);
    }

    #[test]
    fn test_full_contact_collection_escalates() {
        let e = engine();
        let mut s = Session::new("s1");

        resolved(e.begin_turn(&mut s, "human agent please"));
        let out = resolved(e.begin_turn(&mut s, "a@b.com"));
        assert_eq!(s.state(), EscalationState::CollectingPhone);
        assert!(out.reply.to_lowercase().contains("phone"));
        assert_eq!(s.contact().email.as_deref(), Some("a@b.com"));
        assert_invariants(&s);

        let out = resolved(e.begin_turn(&mut s, "555-1234"));
        assert_eq!(s.state(), EscalationState::Escalated);
        assert_eq!(s.contact().phone.as_deref(), Some("555-1234"));
        assert_eq!(
            out.effects,
            vec![Effect::Escalate {
                reason: EscalationReason::UserRequest
            }]
        );
        assert_eq!(s.turns().len(), 6);
        assert_invariants(&s);
    }

    #[test]
    fn test_contact_values_stored_verbatim() {
        let e = engine();
        let mut s = Session::new("s1");
        resolved(e.begin_turn(&mut s, "connect me"));
        resolved(e.begin_turn(&mut s, "not an email at all"));
        assert_eq!(s.contact().email.as_deref(), Some("not an email at all"));
    }

    #[test]
    fn test_trigger_with_known_email_asks_for_phone() {
        let e = engine();
        let mut s = Session::new("s1");
        s.merge_contact(&ContactInfo {
            email: Some("a@b.com".to_string()),
            phone: None,
        });
        let out = resolved(e.begin_turn(&mut s, "I want a real person"));
        assert_eq!(s.state(), EscalationState::CollectingPhone);
        assert!(out.reply.to_lowercase().contains("phone"));
    }

    #[test]
    fn test_trigger_with_full_contact_escalates_directly() {
        let e = engine();
        let mut s = Session::new("s1");
        s.merge_contact(&ContactInfo {
            email: Some("a@b.com".to_string()),
            phone: Some("555".to_string()),
        });
        let out = resolved(e.begin_turn(&mut s, "contact support"));
        assert!(s.is_escalated());
        assert_eq!(
            out.effects,
            vec![Effect::Escalate {
                reason: EscalationReason::UserRequest
            }]
        );
    }

    #[test]
    fn test_plain_question_requires_generation() {
        let e = engine();
        let mut s = Session::new("s1");
        assert_eq!(e.begin_turn(&mut s, "What time is check-in?"), TurnPlan::Generate);
        assert_eq!(s.turns().len(), 1);
        assert_eq!(s.turns()[0].role, Role::User);

        let out = e.finish_answer(&mut s, "What time is check-in?", answer("From 2pm.", false));
        assert_eq!(out.reply, "From 2pm.");
        assert!(out.effects.is_empty());
        assert!(!s.is_escalated());
        assert_eq!(s.turns().len(), 2);
    }

    #[test]
    fn test_book_escalates_regardless_of_context() {
        let e = engine();
        let mut s = Session::new("s1");
        let msg = "book a room for tonight";
        assert_eq!(e.begin_turn(&mut s, msg), TurnPlan::Generate);
        let out = e.finish_answer(&mut s, msg, answer("Sure, rooms are available.", false));
        assert!(s.is_escalated());
        assert_eq!(
            out.effects,
            vec![Effect::Escalate {
                reason: EscalationReason::TransactionIntent
            }]
        );
        assert_eq!(out.reply, e.policy().replies.escalated);
    }

    #[test]
    fn test_low_confidence_marker_escalates() {
        let e = engine();
        let mut s = Session::new("s1");
        let msg = "Do you allow pets?";
        e.begin_turn(&mut s, msg);
        let out = e.finish_answer(&mut s, msg, answer("I’m not sure about pets.", false));
        assert_eq!(
            out.effects,
            vec![Effect::Escalate {
                reason: EscalationReason::LowConfidence
            }]
        );
    }

    #[test]
    fn test_empty_context_alone_escalates() {
        let e = engine();
        let mut s = Session::new("s1");
        let msg = "Is there parking?";
        e.begin_turn(&mut s, msg);
        let out = e.finish_answer(&mut s, msg, answer("Yes, there is parking.", true));
        assert_eq!(
            out.effects,
            vec![Effect::Escalate {
                reason: EscalationReason::NoContext
            }]
        );
    }

    #[test]
    fn test_escalated_session_keeps_answering_without_new_escalations() {
        let e = engine();
        let mut s = Session::new("s1");
        let msg = "book a room";
        e.begin_turn(&mut s, msg);
        e.finish_answer(&mut s, msg, answer("ok", false));
        assert!(s.is_escalated());

        // Trigger phrases no longer start contact collection.
        assert_eq!(e.begin_turn(&mut s, "human agent"), TurnPlan::Generate);
        let out = e.finish_answer(&mut s, "human agent", answer("I'm not sure.", true));
        assert_eq!(out.reply, "I'm not sure.");
        assert!(out.effects.is_empty());
        assert!(s.is_escalated());
        assert_invariants(&s);
    }

    #[test]
    fn test_escalated_flag_never_reverts() {
        let e = engine();
        let mut s = Session::new("s1");
        let script = [
            "human agent",
            "a@b.com",
            "555",
            "thanks",
            "talk to a person",
            "what about breakfast?",
        ];
        let mut seen_escalated = false;
        for msg in script {
            if let TurnPlan::Generate = e.begin_turn(&mut s, msg) {
                e.finish_answer(&mut s, msg, answer("Breakfast is at 7.", false));
            }
            if seen_escalated {
                assert!(s.is_escalated(), "escalated reverted after {:?}", msg);
            }
            seen_escalated |= s.is_escalated();
            assert_invariants(&s);
        }
        assert!(seen_escalated);
    }

    #[test]
    fn test_contact_from_request_records_once() {
        let e = engine();
        let mut s = Session::new("s1");
        s.merge_contact(&ContactInfo {
            email: Some("a@b.com".to_string()),
            phone: Some("555".to_string()),
        });
        e.begin_turn(&mut s, "hello");
        let out = e.finish_answer(&mut s, "hello", answer("Hi!", false));
        assert_eq!(out.effects, vec![Effect::RecordContact]);

        e.begin_turn(&mut s, "thanks");
        let out = e.finish_answer(&mut s, "thanks", answer("You're welcome.", false));
        assert!(out.effects.is_empty());
    }

    #[test]
    fn test_contact_completed_by_escalation_does_not_double_record() {
        let e = engine();
        let mut s = Session::new("s1");
        resolved(e.begin_turn(&mut s, "human agent"));
        resolved(e.begin_turn(&mut s, "a@b.com"));
        let out = resolved(e.begin_turn(&mut s, "555"));
        assert_eq!(out.effects.len(), 1);
        assert!(out.escalated());

        e.begin_turn(&mut s, "ok");
        let out = e.finish_answer(&mut s, "ok", answer("Anything else?", false));
        assert!(out.effects.is_empty());
    }

    #[test]
    fn test_custom_policy_phrases() {
        let policy = EscalationPolicy {
            human_triggers: vec!["operator".to_string()],
            transaction_keywords: vec!["reserve".to_string()],
            ..EscalationPolicy::default()
        };
        let e = EscalationEngine::new(policy);
        assert!(e.wants_human("OPERATOR!"));
        assert!(!e.wants_human("human agent"));
        assert_eq!(
            e.post_hoc_reason("I want to reserve", "fine", false),
            Some(EscalationReason::TransactionIntent)
        );
        assert_eq!(e.post_hoc_reason("book it", "fine", false), None);
    }
}
