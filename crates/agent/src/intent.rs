//! Intent-tag parsing and repair.
//!
//! The generation engine is asked to tag every reply with `INTENT: <word>`
//! (or the bracketed `[INTENT: <word>]` form), but the tag is best-effort
//! text protocol: it can be missing, misspelled, or invented. A missing tag
//! falls back to `greeting`; an unrecognized one repairs by escalating one
//! step from the previous turn's intent instead of surfacing an error.

use once_cell::sync::Lazy;
use regex::Regex;

use autostream_core::Intent;

static INLINE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)INTENT:\s*(\w+)").expect("inline tag pattern compiles"));

static BRACKET_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[INTENT:\s*(.*?)\]").expect("bracket tag pattern compiles"));

static STRIP_BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[INTENT:[^\]]*\]").expect("bracket strip pattern compiles"));

static STRIP_INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)INTENT:\s*\w+\s*").expect("inline strip pattern compiles"));

static STRIP_STATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)STATE:\s*\w+\s*").expect("state strip pattern compiles"));

/// Pull the turn's intent out of the raw reply.
pub fn resolve_intent(raw_reply: &str, previous: Intent) -> Intent {
    let tag = INLINE_TAG_RE
        .captures(raw_reply)
        .or_else(|| BRACKET_TAG_RE.captures(raw_reply))
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().trim().to_string());

    match tag {
        None => Intent::Greeting,
        Some(word) => word.parse().unwrap_or_else(|_| escalate(previous)),
    }
}

/// Remove every intent/state tag from the visible reply.
pub fn strip_tags(raw_reply: &str) -> String {
    let cleaned = STRIP_BRACKET_RE.replace_all(raw_reply, "");
    let cleaned = STRIP_INLINE_RE.replace_all(&cleaned, "");
    let cleaned = STRIP_STATE_RE.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// One-step escalation for unrecognized tags: early intents move forward,
/// later ones hold steady.
fn escalate(previous: Intent) -> Intent {
    match previous {
        Intent::Greeting => Intent::Info,
        Intent::Info | Intent::Pricing => Intent::Comparison,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use autostream_core::Intent;

    use super::{resolve_intent, strip_tags};

    #[test]
    fn parses_inline_tag_case_insensitively() {
        let reply = "Happy to help!\nintent: pricing";
        assert_eq!(resolve_intent(reply, Intent::Greeting), Intent::Pricing);
    }

    #[test]
    fn parses_bracketed_tag() {
        let reply = "[INTENT: high_intent] Great, let's get you set up.";
        assert_eq!(resolve_intent(reply, Intent::Pricing), Intent::HighIntent);
    }

    #[test]
    fn missing_tag_defaults_to_greeting() {
        assert_eq!(resolve_intent("Hello there!", Intent::Pricing), Intent::Greeting);
    }

    #[test]
    fn unrecognized_tag_escalates_from_previous() {
        let reply = "INTENT: checkout";
        assert_eq!(resolve_intent(reply, Intent::Greeting), Intent::Info);
        assert_eq!(resolve_intent(reply, Intent::Info), Intent::Comparison);
        assert_eq!(resolve_intent(reply, Intent::Pricing), Intent::Comparison);
        assert_eq!(resolve_intent(reply, Intent::Comparison), Intent::Comparison);
        assert_eq!(resolve_intent(reply, Intent::HighIntent), Intent::HighIntent);
    }

    #[test]
    fn strips_every_tag_form_from_the_visible_reply() {
        let raw = "[INTENT: pricing] Both plans are listed below. STATE: PRICING";
        assert_eq!(strip_tags(raw), "Both plans are listed below.");

        let raw = "INTENT: info Here is how exports work.";
        assert_eq!(strip_tags(raw), "Here is how exports work.");
    }

    #[test]
    fn stripping_leaves_untagged_replies_alone() {
        assert_eq!(strip_tags("  Just an answer.  "), "Just an answer.");
    }
}
