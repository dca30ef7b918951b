//! Checkout session side-table records.
//!
//! The payment intent's metadata field is size-bounded at the gateway, which
//! used to force truncating the item list to fit. Instead the orchestrator
//! writes the full checkout payload here, keyed by the intent ID, and the
//! webhook processor reads it back when materializing the order. Metadata on
//! the intent remains as a bounded fallback for sessions created elsewhere.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartSnapshot;

/// The full, untruncated checkout payload for one payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Payment gateway intent ID.
    pub payment_intent_id: String,

    /// Cart, customer, and address as submitted.
    pub cart: CartSnapshot,

    /// Computed item subtotal in major units.
    pub subtotal: Decimal,

    /// Quoted shipping cost in major units.
    pub shipping_cost: Decimal,

    /// Charged total in major units.
    pub total: Decimal,

    /// ISO currency code (lowercase, as sent to the gateway).
    pub currency: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Idempotency ledger lifetime.
pub const IDEMPOTENCY_TTL_HOURS: i64 = 24;

/// A stored idempotency result.
///
/// Once a key exists, every later call bearing it yields the stored result
/// without repeating the side effect. Records past `expires_at` read as
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The unique key.
    pub key: String,

    /// Opaque stored result.
    pub result: serde_json::Value,

    /// When the record was written.
    pub created_at: DateTime<Utc>,

    /// When the record stops being authoritative.
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Create a record expiring after the standard TTL.
    #[must_use]
    pub fn new(key: impl Into<String>, result: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            result,
            created_at: now,
            expires_at: now + chrono::Duration::hours(IDEMPOTENCY_TTL_HOURS),
        }
    }

    /// Whether the record has expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A durable fulfillment job.
///
/// Written by the webhook processor before it responds, drained by the
/// dispatcher worker, and recovered at startup, so a crash between "order
/// committed" and "fulfillment submitted" never loses the submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentJob {
    /// The order to fulfill.
    pub order_id: crate::OrderId,

    /// Submission attempts so far.
    pub attempts: u32,

    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl FulfillmentJob {
    /// Create a fresh job for an order.
    #[must_use]
    pub fn new(order_id: crate::OrderId) -> Self {
        Self {
            order_id,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_record_expires_after_ttl() {
        let record = IdempotencyRecord::new("cart_abc", serde_json::json!({"ok": true}));
        assert!(!record.is_expired_at(Utc::now()));
        assert!(record.is_expired_at(Utc::now() + chrono::Duration::hours(25)));
    }
}
