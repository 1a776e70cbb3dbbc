//! Core domain logic for the AutoStream lead-qualification backend.
//!
//! Everything here is synchronous and pure: the per-session record and its
//! invariants, the six-phase conversation automaton, the slot extractor, and
//! the lead-capture trigger rule. The stateful registry lives in
//! `autostream-memory`; the external collaborators (generation, retrieval,
//! channel lookup, capture sink) and the per-turn orchestration live in
//! `autostream-agent`.

pub mod capture;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod flows;

pub use capture::{missing_fields, should_capture, CLOSING_MESSAGE};
pub use domain::lead::{CaptureReceipt, QualifiedLead};
pub use domain::session::{
    ChannelAnalysis, ChatMessage, ConversationPhase, Intent, ParseIntentError, PublicState, Role,
    SessionRecord, SessionSummary,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extract::{extract_slots, SlotUpdates};
pub use flows::advance;
