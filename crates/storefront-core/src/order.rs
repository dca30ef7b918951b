//! Order and fulfillment records.
//!
//! An [`Order`] is materialized exactly once per successful payment by the
//! webhook processor; a [`Fulfillment`] is created exactly once per order by
//! the dispatcher and then mutated in place by provider status callbacks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartItem, ShippingAddress};
use crate::ids::{OrderId, ReadableOrderId};

/// A paid order materialized from a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal order ID.
    pub id: OrderId,

    /// Payment gateway intent ID. Unique across all orders; this uniqueness
    /// is the concurrency-control primitive for webhook processing.
    pub payment_intent_id: String,

    /// Human-facing order reference.
    pub readable_order_id: ReadableOrderId,

    /// Customer email.
    pub customer_email: String,

    /// Item snapshot at payment time.
    pub items: Vec<CartItem>,

    /// Shipping address snapshot at payment time.
    pub shipping_address: ShippingAddress,

    /// Item subtotal in major units.
    pub subtotal: Decimal,

    /// Shipping cost in major units.
    pub shipping_cost: Decimal,

    /// Charged total in major units.
    pub total_amount: Decimal,

    /// ISO currency code (uppercase).
    pub currency: String,

    /// Current order status.
    pub status: OrderStatus,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment captured.
    Paid,

    /// Order canceled after payment (manual remediation path).
    Canceled,
}

/// A fulfillment request submitted to the print-on-demand provider.
///
/// One-to-one with [`Order`]; the provider-facing idempotency key is derived
/// solely from the order ID so resubmission never creates a second shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fulfillment {
    /// The order this fulfillment belongs to.
    pub order_id: OrderId,

    /// Provider-side order ID returned on submission.
    pub provider_order_id: String,

    /// Current fulfillment status.
    pub status: FulfillmentStatus,

    /// Tracking details, populated by shipment callbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingInfo>,

    /// When the fulfillment was submitted.
    pub created_at: DateTime<Utc>,

    /// When the fulfillment was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Fulfillment {
    /// Create a freshly-submitted fulfillment record.
    #[must_use]
    pub fn submitted(order_id: OrderId, provider_order_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            provider_order_id: provider_order_id.into(),
            status: FulfillmentStatus::Submitted,
            tracking: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fulfillment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    /// Submitted to the provider, not yet shipped.
    Submitted,

    /// Package shipped; tracking info available.
    Shipped,

    /// Package delivered.
    Delivered,

    /// Canceled at the provider.
    Canceled,

    /// Provider reported a failure; needs manual remediation.
    Failed,
}

impl FulfillmentStatus {
    /// Parse a provider status string, mapping unknown values to `None`.
    #[must_use]
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "submitted" | "draft" | "pending" | "inprocess" | "onhold" => Some(Self::Submitted),
            "shipped" | "package_shipped" | "partially_shipped" => Some(Self::Shipped),
            "delivered" | "fulfilled" => Some(Self::Delivered),
            "canceled" | "order_canceled" => Some(Self::Canceled),
            "failed" | "order_failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Shipment tracking details from a provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    /// Carrier tracking number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    /// Carrier tracking URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,

    /// When the package shipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_status_from_provider() {
        assert_eq!(
            FulfillmentStatus::from_provider("package_shipped"),
            Some(FulfillmentStatus::Shipped)
        );
        assert_eq!(
            FulfillmentStatus::from_provider("order_failed"),
            Some(FulfillmentStatus::Failed)
        );
        assert_eq!(FulfillmentStatus::from_provider("mystery"), None);
    }

    #[test]
    fn submitted_fulfillment_has_no_tracking() {
        let f = Fulfillment::submitted(OrderId::generate(), "pf-123");
        assert_eq!(f.status, FulfillmentStatus::Submitted);
        assert!(f.tracking.is_none());
    }
}
