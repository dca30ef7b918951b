//! Stripe API types.

use serde::Deserialize;

/// Stripe `PaymentIntent` object.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Payment intent ID.
    pub id: String,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: i64,
    /// Currency (e.g., "gbp").
    #[serde(default)]
    pub currency: String,
    /// Status (succeeded, `requires_payment_method`, etc.).
    #[serde(default)]
    pub status: String,
    /// Client secret for confirming the payment in the browser.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Receipt email.
    #[serde(default)]
    pub receipt_email: Option<String>,
    /// Metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
}

/// Stripe error response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// The error details.
    pub error: StripeErrorBody,
}

/// Stripe error details.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    /// Error type, e.g. `invalid_request_error`.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
}
