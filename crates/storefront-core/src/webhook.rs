//! Webhook event records.
//!
//! Every delivered notification gets a row keyed by the provider event ID
//! before processing begins, so a concurrent duplicate delivery detects
//! "already seen" deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Provider event ID (globally unique per provider).
    pub event_id: String,

    /// Event source, e.g. `stripe` or `printful`.
    pub source: String,

    /// Provider event type, e.g. `payment_intent.succeeded`.
    pub event_type: String,

    /// Raw event payload for the audit trail.
    pub payload: serde_json::Value,

    /// Whether handling finished (successfully or not).
    pub processed: bool,

    /// When handling finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    /// Error message if handling failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the delivery was first recorded.
    pub created_at: DateTime<Utc>,
}

impl WebhookEvent {
    /// Create an unprocessed event row for a fresh delivery.
    #[must_use]
    pub fn received(
        event_id: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            source: source.into(),
            event_type: event_type.into(),
            payload,
            processed: false,
            processed_at: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}
