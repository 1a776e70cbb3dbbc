use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::DomainError;

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// The six conversation phases, in selling order. The derived `Ord` is the
/// total order the monotonicity invariant is checked against: a record's
/// phase only ever moves rightward, and `Final` is absorbing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationPhase {
    #[default]
    Discovery,
    Exploring,
    Pricing,
    Confirmation,
    Qualified,
    Final,
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Discovery => "DISCOVERY",
            Self::Exploring => "EXPLORING",
            Self::Pricing => "PRICING",
            Self::Confirmation => "CONFIRMATION",
            Self::Qualified => "QUALIFIED",
            Self::Final => "FINAL",
        };
        f.write_str(label)
    }
}

/// Per-turn classification of visitor purpose, distinct from the phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    Greeting,
    Info,
    Pricing,
    Comparison,
    Objection,
    HighIntent,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Greeting => "greeting",
            Self::Info => "info",
            Self::Pricing => "pricing",
            Self::Comparison => "comparison",
            Self::Objection => "objection",
            Self::HighIntent => "high_intent",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unrecognized intent tag `{0}`")]
pub struct ParseIntentError(pub String);

impl FromStr for Intent {
    type Err = ParseIntentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greeting" => Ok(Self::Greeting),
            "info" => Ok(Self::Info),
            "pricing" => Ok(Self::Pricing),
            "comparison" => Ok(Self::Comparison),
            "objection" => Ok(Self::Objection),
            "high_intent" => Ok(Self::HighIntent),
            other => Err(ParseIntentError(other.to_string())),
        }
    }
}

/// Result of the channel-metadata lookup for a shared channel link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAnalysis {
    pub channel_name: String,
    pub channel_url: String,
    pub content_type: String,
    pub upload_frequency: String,
    pub recommendation: String,
    pub pro_benefits: Vec<String>,
}

/// The full per-conversation state object, keyed by an opaque caller-supplied
/// session identifier.
///
/// Invariants enforced here rather than by callers:
/// - `phase` is monotonic under [`ConversationPhase`]'s total order
///   (`transition_to` rejects regressions, `Final` is absorbing);
/// - the five visitor slots are first-write-wins (`fill_slot`);
/// - `lead_captured` flips false -> true exactly once (`mark_captured`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub phase: ConversationPhase,
    pub intent: Intent,
    pub name: Option<String>,
    pub email: Option<String>,
    pub platform: Option<String>,
    pub selected_plan: Option<String>,
    pub channel_link: Option<String>,
    pub channel_analysis: Option<ChannelAnalysis>,
    pub channel_analysis_done: bool,
    pub channel_permission_asked: bool,
    pub lead_captured: bool,
    pub turn_count: u32,
    pub retrieved_context: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            phase: ConversationPhase::Discovery,
            intent: Intent::Greeting,
            name: None,
            email: None,
            platform: None,
            selected_plan: None,
            channel_link: None,
            channel_analysis: None,
            channel_analysis_done: false,
            channel_permission_asked: false,
            lead_captured: false,
            turn_count: 0,
            retrieved_context: None,
            created_at: Utc::now(),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// Move to `next`, rejecting any transition that would regress the phase.
    /// Staying in place is always allowed.
    pub fn transition_to(&mut self, next: ConversationPhase) -> Result<(), DomainError> {
        if next < self.phase {
            return Err(DomainError::PhaseRegression { from: self.phase, to: next });
        }
        self.phase = next;
        Ok(())
    }

    /// Flip `lead_captured`, exactly once per session.
    pub fn mark_captured(&mut self) -> Result<(), DomainError> {
        if self.lead_captured {
            return Err(DomainError::LeadAlreadyCaptured { session_id: self.session_id.clone() });
        }
        self.lead_captured = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.phase == ConversationPhase::Final || self.lead_captured
    }

    pub fn public_state(&self) -> PublicState {
        PublicState {
            conversation_state: self.phase,
            selected_plan: self.selected_plan.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            platform: self.platform.clone(),
            channel_link: self.channel_link.clone(),
            lead_captured: self.lead_captured,
            turn_count: self.turn_count,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            intent: self.intent,
            conversation_state: self.phase,
            selected_plan: self.selected_plan.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            platform: self.platform.clone(),
            lead_captured: self.lead_captured,
            turn_count: self.turn_count,
            message_count: self.messages.len(),
        }
    }
}

/// The state slice returned with every chat reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicState {
    pub conversation_state: ConversationPhase,
    pub selected_plan: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub platform: Option<String>,
    pub channel_link: Option<String>,
    pub lead_captured: bool,
    pub turn_count: u32,
}

/// Lookup-only view served by `GET /api/session/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub intent: Intent,
    pub conversation_state: ConversationPhase,
    pub selected_plan: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub platform: Option<String>,
    pub lead_captured: bool,
    pub turn_count: u32,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, ConversationPhase, Intent, Role, SessionRecord};
    use crate::errors::DomainError;

    #[test]
    fn phases_are_totally_ordered_in_selling_order() {
        use ConversationPhase::*;
        let order = [Discovery, Exploring, Pricing, Confirmation, Qualified, Final];
        for window in order.windows(2) {
            assert!(window[0] < window[1], "{} should precede {}", window[0], window[1]);
        }
    }

    #[test]
    fn transition_rejects_regression() {
        let mut record = SessionRecord::new("s-1");
        record.transition_to(ConversationPhase::Pricing).expect("forward transition");

        let error = record
            .transition_to(ConversationPhase::Discovery)
            .expect_err("regression must be rejected");
        assert!(matches!(error, DomainError::PhaseRegression { .. }));
        assert_eq!(record.phase, ConversationPhase::Pricing);
    }

    #[test]
    fn transition_allows_staying_in_place() {
        let mut record = SessionRecord::new("s-2");
        record.transition_to(ConversationPhase::Exploring).expect("forward");
        record.transition_to(ConversationPhase::Exploring).expect("self transition is a no-op");
        assert_eq!(record.phase, ConversationPhase::Exploring);
    }

    #[test]
    fn capture_flag_flips_exactly_once() {
        let mut record = SessionRecord::new("s-3");
        record.mark_captured().expect("first capture");
        assert!(record.lead_captured);

        let error = record.mark_captured().expect_err("second capture must be rejected");
        assert!(matches!(error, DomainError::LeadAlreadyCaptured { .. }));
    }

    #[test]
    fn intent_parses_tag_forms_case_insensitively() {
        assert_eq!("HIGH_INTENT".parse::<Intent>().expect("parse"), Intent::HighIntent);
        assert_eq!(" pricing ".parse::<Intent>().expect("parse"), Intent::Pricing);
        assert!("checkout".parse::<Intent>().is_err());
    }

    #[test]
    fn fresh_record_has_default_shape() {
        let record = SessionRecord::new("s-4");
        assert_eq!(record.phase, ConversationPhase::Discovery);
        assert_eq!(record.intent, Intent::Greeting);
        assert_eq!(record.turn_count, 0);
        assert!(record.messages.is_empty());
        assert!(!record.lead_captured);
        assert!(!record.is_closed());
    }

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::assistant("hello").role, Role::Assistant);
    }
}
