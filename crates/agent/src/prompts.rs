//! Prompt assembly for the generation engine.

use autostream_core::SessionRecord;

/// Served whenever the generation engine fails; the turn otherwise leaves the
/// record at its last committed state.
pub const FALLBACK_REPLY: &str =
    "I'm here to help! What would you like to know about our video editing plans?";

/// Build the per-turn system prompt: selling instructions plus the record's
/// known fields, current phase, and retrieved knowledge.
pub fn build_system_prompt(record: &SessionRecord, context: &str) -> String {
    format!(
        "You are AutoStream AI, a SaaS sales agent for AI-powered video editing.\n\
         \n\
         KNOWLEDGE:\n{context}\n\
         \n\
         STATE: Name={name} | Email={email} | Platform={platform} | Plan={plan}\n\
         CONVERSATION STATE: {phase}\n\
         \n\
         The conversation moves through six states in order: DISCOVERY, EXPLORING, PRICING,\n\
         CONFIRMATION, QUALIFIED, FINAL. Never move backwards. CONFIRMATION lasts one turn\n\
         only. In FINAL stop selling, stop asking questions, and close gracefully.\n\
         \n\
         Classify every reply into exactly one intent: GREETING, INFO, PRICING, COMPARISON,\n\
         OBJECTION, or HIGH_INTENT. Escalate gradually; reserve HIGH_INTENT for explicit\n\
         commitment such as \"sign me up\" or \"I'll take the Pro plan\" - plain agreement\n\
         like \"sounds good\" is not high intent. End the reply with a tag line in the form\n\
         INTENT: <intent>\n\
         \n\
         Answer from the knowledge section only, never invent plan facts. Keep replies\n\
         short, ask at most one question, and collect name, then email, then platform one\n\
         field at a time once the visitor commits.",
        context = if context.is_empty() { "Knowledge base not available." } else { context },
        name = record.name.as_deref().unwrap_or("Unknown"),
        email = record.email.as_deref().unwrap_or("Unknown"),
        platform = record.platform.as_deref().unwrap_or("Unknown"),
        plan = record.selected_plan.as_deref().unwrap_or("None"),
        phase = record.phase,
    )
}

#[cfg(test)]
mod tests {
    use autostream_core::{ConversationPhase, SessionRecord};

    use super::build_system_prompt;

    #[test]
    fn prompt_embeds_known_fields_and_phase() {
        let mut record = SessionRecord::new("s-prompt");
        record.name = Some("Sarah".to_string());
        record.phase = ConversationPhase::Pricing;

        let prompt = build_system_prompt(&record, "[Context 1]\nPro is 79 dollars.");

        assert!(prompt.contains("Name=Sarah"));
        assert!(prompt.contains("Email=Unknown"));
        assert!(prompt.contains("CONVERSATION STATE: PRICING"));
        assert!(prompt.contains("Pro is 79 dollars."));
    }

    #[test]
    fn empty_context_reads_as_unavailable() {
        let record = SessionRecord::new("s-prompt-2");
        let prompt = build_system_prompt(&record, "");
        assert!(prompt.contains("Knowledge base not available."));
    }
}
