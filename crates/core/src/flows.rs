//! The six-phase conversation automaton.
//!
//! `advance` is a pure function of the current phase, the turn's classified
//! intent, the lowercased user text, and the capture flag. Every reachable
//! transition moves rightward under [`ConversationPhase`]'s total order;
//! `Final` is absorbing. When no condition matches, the phase holds.

use crate::domain::session::{ConversationPhase, Intent};

/// Platform or posting-cadence mentions move Discovery forward.
const DISCOVERY_KEYWORDS: [&str; 6] =
    ["youtube", "tiktok", "instagram", "weekly", "daily", "monthly"];

/// Price-talk mentions move Exploring (or Discovery, see below) to Pricing.
const PRICING_KEYWORDS: [&str; 4] = ["price", "cost", "plan", "how much"];

/// Soft-agreement language moves Pricing to Confirmation.
const AGREEMENT_KEYWORDS: [&str; 4] = ["sounds good", "okay", "interested", "like it"];

fn mentions_any(lower_text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lower_text.contains(keyword))
}

fn asks_about_pricing(intent: Intent, lower_text: &str) -> bool {
    matches!(intent, Intent::Pricing | Intent::Comparison)
        || mentions_any(lower_text, &PRICING_KEYWORDS)
}

/// Compute the next phase for one turn.
///
/// `lead_captured` reflects the record going into the turn; a capture that
/// succeeds mid-turn forces `Final` at the trigger site instead, so this
/// function stays pure.
///
/// Precedence note: in Discovery the pricing check runs before the platform
/// check, so a pricing question asked before any platform mention skips
/// Exploring entirely, and a message carrying both signals lands in Pricing.
pub fn advance(
    phase: ConversationPhase,
    intent: Intent,
    lower_text: &str,
    lead_captured: bool,
) -> ConversationPhase {
    use ConversationPhase::*;

    match phase {
        Discovery => {
            if asks_about_pricing(intent, lower_text) {
                Pricing
            } else if mentions_any(lower_text, &DISCOVERY_KEYWORDS) {
                Exploring
            } else {
                Discovery
            }
        }
        Exploring => {
            if asks_about_pricing(intent, lower_text) {
                Pricing
            } else {
                Exploring
            }
        }
        Pricing => {
            // High intent bypasses the soft-agreement stop entirely.
            if intent == Intent::HighIntent {
                Qualified
            } else if mentions_any(lower_text, &AGREEMENT_KEYWORDS) {
                Confirmation
            } else {
                Pricing
            }
        }
        // Single-turn phase: every turn leaves it, committed or not, so an
        // ambiguous follow-up can never loop the conversation here.
        Confirmation => Qualified,
        Qualified => {
            if lead_captured {
                Final
            } else {
                Qualified
            }
        }
        Final => Final,
    }
}

#[cfg(test)]
mod tests {
    use super::advance;
    use crate::domain::session::{ConversationPhase, Intent};

    #[test]
    fn discovery_moves_to_exploring_on_platform_or_cadence() {
        for text in ["i post on tiktok", "i upload weekly", "mostly instagram stuff"] {
            assert_eq!(
                advance(ConversationPhase::Discovery, Intent::Info, text, false),
                ConversationPhase::Exploring,
                "text: {text}"
            );
        }
    }

    #[test]
    fn discovery_holds_without_signal() {
        assert_eq!(
            advance(ConversationPhase::Discovery, Intent::Greeting, "hi there", false),
            ConversationPhase::Discovery
        );
    }

    #[test]
    fn discovery_skips_to_pricing_on_price_talk() {
        assert_eq!(
            advance(
                ConversationPhase::Discovery,
                Intent::Pricing,
                "what pricing plans do you offer?",
                false
            ),
            ConversationPhase::Pricing
        );
    }

    #[test]
    fn discovery_pricing_signal_wins_over_platform_signal() {
        assert_eq!(
            advance(
                ConversationPhase::Discovery,
                Intent::Info,
                "how much is it for youtube creators?",
                false
            ),
            ConversationPhase::Pricing
        );
    }

    #[test]
    fn exploring_moves_to_pricing_on_intent_or_keyword() {
        assert_eq!(
            advance(ConversationPhase::Exploring, Intent::Comparison, "basic or the other?", false),
            ConversationPhase::Pricing
        );
        assert_eq!(
            advance(ConversationPhase::Exploring, Intent::Info, "what does it cost?", false),
            ConversationPhase::Pricing
        );
        assert_eq!(
            advance(ConversationPhase::Exploring, Intent::Info, "tell me about captions", false),
            ConversationPhase::Exploring
        );
    }

    #[test]
    fn pricing_moves_to_confirmation_on_agreement() {
        assert_eq!(
            advance(ConversationPhase::Pricing, Intent::Info, "okay that sounds good", false),
            ConversationPhase::Confirmation
        );
    }

    #[test]
    fn pricing_jumps_straight_to_qualified_on_high_intent() {
        // The shortcut also beats agreement language present in the same text.
        assert_eq!(
            advance(ConversationPhase::Pricing, Intent::HighIntent, "okay sign me up", false),
            ConversationPhase::Qualified
        );
    }

    #[test]
    fn confirmation_exits_unconditionally_after_one_turn() {
        for (intent, text) in [
            (Intent::HighIntent, "i'll take pro"),
            (Intent::Info, "hmm tell me more"),
            (Intent::Objection, "still feels pricey"),
        ] {
            assert_eq!(
                advance(ConversationPhase::Confirmation, intent, text, false),
                ConversationPhase::Qualified,
                "intent: {intent}"
            );
        }
    }

    #[test]
    fn qualified_holds_until_capture_succeeds() {
        assert_eq!(
            advance(ConversationPhase::Qualified, Intent::HighIntent, "email on the way", false),
            ConversationPhase::Qualified
        );
        assert_eq!(
            advance(ConversationPhase::Qualified, Intent::HighIntent, "done", true),
            ConversationPhase::Final
        );
    }

    #[test]
    fn final_is_absorbing() {
        for intent in
            [Intent::Greeting, Intent::Pricing, Intent::HighIntent, Intent::Objection]
        {
            assert_eq!(
                advance(ConversationPhase::Final, intent, "one more question", true),
                ConversationPhase::Final
            );
        }
    }

    #[test]
    fn every_reachable_transition_is_forward_only() {
        use ConversationPhase::*;
        let phases = [Discovery, Exploring, Pricing, Confirmation, Qualified, Final];
        let intents = [
            Intent::Greeting,
            Intent::Info,
            Intent::Pricing,
            Intent::Comparison,
            Intent::Objection,
            Intent::HighIntent,
        ];
        let texts = [
            "hi",
            "i'm on youtube weekly",
            "what's the price of the plan",
            "okay sounds good, interested",
            "sign me up",
        ];

        for phase in phases {
            for intent in intents {
                for text in texts {
                    for captured in [false, true] {
                        let next = advance(phase, intent, text, captured);
                        assert!(
                            next >= phase,
                            "regression {phase} -> {next} on intent={intent} text={text:?}"
                        );
                    }
                }
            }
        }
    }
}
