//! Per-turn orchestration.
//!
//! `run_turn` composes the deterministic core (extraction, phase automaton,
//! capture trigger) with the three external calls (retrieval, generation,
//! channel lookup), issued sequentially because each depends on the previous
//! step's partial results. The caller owns persistence: it reads the record
//! from the registry under the session's turn lock, hands it in by value, and
//! writes the returned record back.

use std::sync::Arc;

use tracing::{info, warn};

use autostream_core::{
    advance, capture::CLOSING_MESSAGE, extract_slots, should_capture, ApplicationError,
    ConversationPhase, Intent, QualifiedLead, SessionRecord,
};

use crate::channel::ChannelLookup;
use crate::intent::{resolve_intent, strip_tags};
use crate::llm::LlmClient;
use crate::prompts::{build_system_prompt, FALLBACK_REPLY};
use crate::rag::{format_context, ContextRetriever};
use crate::sink::LeadSink;

/// What a processed turn hands back to the transport layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub intent: Intent,
    pub captured_now: bool,
}

pub struct TurnRuntime {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn ContextRetriever>,
    channel_lookup: Arc<dyn ChannelLookup>,
    lead_sink: Arc<dyn LeadSink>,
    top_k: usize,
}

impl TurnRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn ContextRetriever>,
        channel_lookup: Arc<dyn ChannelLookup>,
        lead_sink: Arc<dyn LeadSink>,
        top_k: usize,
    ) -> Self {
        Self { llm, retriever, channel_lookup, lead_sink, top_k }
    }

    /// Process one inbound user message against the session record.
    pub async fn run_turn(
        &self,
        mut record: SessionRecord,
        message: &str,
    ) -> Result<(SessionRecord, TurnOutcome), ApplicationError> {
        record.push_user(message);

        // Closed sessions only ever get the fixed closing reply; no engine
        // is consulted and the capture sink can never fire again.
        if record.is_closed() {
            record.transition_to(ConversationPhase::Final)?;
            record.push_assistant(CLOSING_MESSAGE);
            record.turn_count += 1;
            let intent = record.intent;
            return Ok((
                record,
                TurnOutcome { reply: CLOSING_MESSAGE.to_string(), intent, captured_now: false },
            ));
        }

        let snippets = self.retriever.retrieve(message, self.top_k).await;
        let context = format_context(&snippets);
        let system_prompt = build_system_prompt(&record, &context);

        let raw_reply = match self.llm.complete(&system_prompt, message).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.generation_failed",
                    session_id = %record.session_id,
                    error = %error,
                    "generation engine failed, serving fallback reply"
                );
                record.push_assistant(FALLBACK_REPLY);
                let intent = record.intent;
                return Ok((
                    record,
                    TurnOutcome { reply: FALLBACK_REPLY.to_string(), intent, captured_now: false },
                ));
            }
        };

        let intent = resolve_intent(&raw_reply, record.intent);
        let mut reply = strip_tags(&raw_reply);

        let lower_message = message.to_lowercase();
        let slots = extract_slots(message, &record);
        let next_phase = advance(record.phase, intent, &lower_message, record.lead_captured);

        slots.apply_to(&mut record);
        record.intent = intent;
        record.transition_to(next_phase)?;

        if slots.channel_link.is_some() && !record.channel_analysis_done {
            if let Some(channel_link) = record.channel_link.clone() {
                if let Some(analysis) = self.channel_lookup.analyze(&channel_link).await {
                    info!(
                        event_name = "agent.turn.channel_analyzed",
                        session_id = %record.session_id,
                        channel_name = %analysis.channel_name,
                        "channel metadata stored"
                    );
                    record.channel_analysis = Some(analysis);
                    record.channel_analysis_done = true;
                }
            }
        }

        let mut captured_now = false;
        if should_capture(&record) {
            if let Some(lead) = QualifiedLead::from_record(&record) {
                match self.lead_sink.capture(&lead).await {
                    Ok(receipt) => {
                        info!(
                            event_name = "agent.turn.lead_captured",
                            session_id = %record.session_id,
                            confirmation = %receipt.confirmation,
                            "lead handed off to capture sink"
                        );
                        record.mark_captured()?;
                        record.transition_to(ConversationPhase::Final)?;
                        reply = CLOSING_MESSAGE.to_string();
                        captured_now = true;
                    }
                    Err(error) => {
                        // Flag stays false so the trigger re-evaluates and
                        // retries on the next qualifying turn.
                        warn!(
                            event_name = "agent.turn.capture_failed",
                            session_id = %record.session_id,
                            error = %error,
                            "capture sink failed, lead not marked captured"
                        );
                    }
                }
            }
        }

        record.retrieved_context = (!context.is_empty()).then_some(context);
        record.push_assistant(reply.clone());
        record.turn_count += 1;

        Ok((record, TurnOutcome { reply, intent, captured_now }))
    }
}
