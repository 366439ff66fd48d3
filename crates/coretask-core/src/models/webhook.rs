use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound webhook registration
///
/// Delivery is a caller concern; storage only keeps the target configuration
/// and the trigger bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    pub trigger_count: u64,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a webhook
#[derive(Debug, Clone)]
pub struct NewWebhook {
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    pub created_by: u64,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct WebhookPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub trigger_count: Option<u64>,
    pub last_triggered: Option<DateTime<Utc>>,
}
