//! Channel-metadata lookup for shared video-channel links.
//!
//! At most one lookup runs per session (the record's `channel_analysis_done`
//! latch, set only when a lookup actually produced a result). The default
//! implementation derives everything from the URL itself; a real data-API
//! client would implement the same trait.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use autostream_core::ChannelAnalysis;

/// Descriptive metadata for a channel URL, or `None` when the URL cannot be
/// parsed.
#[async_trait]
pub trait ChannelLookup: Send + Sync {
    async fn analyze(&self, channel_url: &str) -> Option<ChannelAnalysis>;
}

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/@([^/\s?]+)").expect("handle pattern compiles"));

static CHANNEL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/channel/([^/\s?]+)").expect("channel pattern compiles"));

static LEGACY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/c/([^/\s?]+)").expect("legacy pattern compiles"));

/// URL-derived channel analysis with upsell framing.
#[derive(Clone, Copy, Debug, Default)]
pub struct HandleChannelLookup;

impl HandleChannelLookup {
    fn identifier(channel_url: &str) -> Option<String> {
        [&*HANDLE_RE, &*CHANNEL_ID_RE, &*LEGACY_RE]
            .into_iter()
            .find_map(|pattern| pattern.captures(channel_url))
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().to_string())
    }
}

#[async_trait]
impl ChannelLookup for HandleChannelLookup {
    async fn analyze(&self, channel_url: &str) -> Option<ChannelAnalysis> {
        let channel_name = Self::identifier(channel_url)?;

        Some(ChannelAnalysis {
            channel_name,
            channel_url: channel_url.to_string(),
            content_type: "YouTube Creator".to_string(),
            upload_frequency: "Regular uploads detected".to_string(),
            recommendation: "Based on your channel, Pro plan offers better value for growth"
                .to_string(),
            pro_benefits: vec![
                "Upgrade to 4K for better viewer engagement and retention".to_string(),
                "Unlimited exports support consistent upload schedule".to_string(),
                "AI captions improve SEO and accessibility for broader reach".to_string(),
                "Priority support ensures quick resolution for time-sensitive uploads"
                    .to_string(),
            ],
        })
    }
}
