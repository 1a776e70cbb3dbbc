use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use autostream_core::{CaptureReceipt, QualifiedLead};

/// The lead-capture sink: persists or forwards a completed lead. The trigger
/// rule guarantees at-most-once invocation per session, so implementations
/// only need to be idempotent-safe, not deduplicating.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn capture(&self, lead: &QualifiedLead) -> Result<CaptureReceipt>;
}

/// Default sink: emits the lead as a structured log event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLeadSink;

#[async_trait]
impl LeadSink for TracingLeadSink {
    async fn capture(&self, lead: &QualifiedLead) -> Result<CaptureReceipt> {
        info!(
            event_name = "agent.lead.captured",
            name = %lead.name,
            email = %lead.email,
            platform = %lead.platform,
            selected_plan = %lead.selected_plan,
            channel_link = lead.channel_link.as_deref().unwrap_or("none"),
            "qualified lead captured"
        );
        Ok(CaptureReceipt {
            confirmation: format!(
                "Lead captured: {} ({}) - {} plan",
                lead.name, lead.email, lead.selected_plan
            ),
        })
    }
}

/// Forwards leads to an external endpoint as JSON.
pub struct WebhookLeadSink {
    http: reqwest::Client,
    endpoint: String,
}

impl WebhookLeadSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building capture webhook client")?;
        Ok(Self { http, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl LeadSink for WebhookLeadSink {
    async fn capture(&self, lead: &QualifiedLead) -> Result<CaptureReceipt> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(lead)
            .send()
            .await
            .context("posting lead to capture webhook")?
            .error_for_status()
            .context("capture webhook rejected the lead")?;

        let status = response.status();
        Ok(CaptureReceipt { confirmation: format!("webhook accepted lead with status {status}") })
    }
}
