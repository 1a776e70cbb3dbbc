//! Agent runtime - per-turn orchestration around the external engines.
//!
//! This crate owns the contracts for the four external collaborators and the
//! composition that runs once per inbound message:
//! 1. **Retrieval** (`rag`) - supporting snippets for the prompt
//! 2. **Generation** (`llm`) - one completion call per turn
//! 3. **Intent repair** (`intent`) - best-effort tag parsing with
//!    escalation-aware defaulting
//! 4. **Channel lookup** (`channel`) - at most one metadata lookup per session
//! 5. **Lead capture** (`sink`) - the one-shot handoff of a qualified lead
//!
//! # Safety Principle
//!
//! The LLM only produces reply text and a best-effort intent tag. Phase
//! transitions, slot extraction, and the capture decision are deterministic
//! rules in `autostream-core`; a confused model can never capture a lead
//! twice or move a conversation backwards.

pub mod channel;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod rag;
pub mod runtime;
pub mod sink;

pub use channel::{ChannelLookup, HandleChannelLookup};
pub use llm::{GroqClient, LlmClient};
pub use rag::{format_context, ContextRetriever, KnowledgeBase};
pub use runtime::{TurnOutcome, TurnRuntime};
pub use sink::{LeadSink, TracingLeadSink, WebhookLeadSink};
