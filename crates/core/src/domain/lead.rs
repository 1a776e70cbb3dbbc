use serde::{Deserialize, Serialize};

use crate::domain::session::SessionRecord;

/// The payload handed to the capture sink: the four required slots plus the
/// optional channel link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedLead {
    pub name: String,
    pub email: String,
    pub platform: String,
    pub selected_plan: String,
    pub channel_link: Option<String>,
}

impl QualifiedLead {
    /// Build the sink payload from a record, or `None` while any required
    /// slot is still missing.
    pub fn from_record(record: &SessionRecord) -> Option<Self> {
        Some(Self {
            name: record.name.clone()?,
            email: record.email.clone()?,
            platform: record.platform.clone()?,
            selected_plan: record.selected_plan.clone()?,
            channel_link: record.channel_link.clone(),
        })
    }
}

/// Opaque confirmation returned by a capture sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureReceipt {
    pub confirmation: String,
}
