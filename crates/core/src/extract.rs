//! Slot extraction from raw visitor text.
//!
//! Pure and pattern-based; the generation engine is never consulted. Every
//! slot is first-write-wins: a field already set on the record is neither
//! re-derived here nor overwritten by `SlotUpdates::apply_to`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::session::SessionRecord;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("email pattern compiles"));

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:my name is|i'm|i am|call me) ([\w\s]+)").expect("name pattern compiles")
});

static CHANNEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/\S+|youtu\.be/\S+")
        .expect("channel pattern compiles")
});

/// Canonical display casing for recognized platforms.
const PLATFORMS: [(&str, &str); 3] =
    [("youtube", "YouTube"), ("tiktok", "TikTok"), ("instagram", "Instagram")];

/// Partial field updates produced by one extraction pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotUpdates {
    pub name: Option<String>,
    pub email: Option<String>,
    pub platform: Option<String>,
    pub selected_plan: Option<String>,
    pub channel_link: Option<String>,
}

impl SlotUpdates {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.platform.is_none()
            && self.selected_plan.is_none()
            && self.channel_link.is_none()
    }

    /// Merge into the record, first-write-wins per slot.
    pub fn apply_to(&self, record: &mut SessionRecord) {
        fill(&mut record.name, &self.name);
        fill(&mut record.email, &self.email);
        fill(&mut record.platform, &self.platform);
        fill(&mut record.selected_plan, &self.selected_plan);
        fill(&mut record.channel_link, &self.channel_link);
    }
}

fn fill(slot: &mut Option<String>, update: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(update);
    }
}

/// Run one extraction pass over raw user text against the current record.
pub fn extract_slots(text: &str, record: &SessionRecord) -> SlotUpdates {
    let lower = text.to_lowercase();
    let mut updates = SlotUpdates::default();

    if record.email.is_none() {
        if let Some(found) = EMAIL_RE.find(text) {
            updates.email = Some(found.as_str().to_string());
        }
    }

    // "pro" outranks "basic" when both appear in the same message.
    if record.selected_plan.is_none() {
        if lower.contains("pro") {
            updates.selected_plan = Some("pro".to_string());
        } else if lower.contains("basic") {
            updates.selected_plan = Some("basic".to_string());
        }
    }

    if record.platform.is_none() {
        updates.platform = PLATFORMS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, display)| (*display).to_string());
    }

    if record.name.is_none() {
        if let Some(captures) = NAME_RE.captures(&lower) {
            let first_word = captures
                .get(1)
                .map(|words| words.as_str())
                .and_then(|words| words.split_whitespace().next());
            updates.name = first_word.map(capitalize);
        }
    }

    if record.channel_link.is_none()
        && (lower.contains("youtube.com") || lower.contains("youtu.be"))
    {
        if let Some(found) = CHANNEL_RE.find(text) {
            updates.channel_link = Some(found.as_str().to_string());
        }
    }

    updates
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
