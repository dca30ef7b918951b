//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Idempotency ledger records, keyed by idempotency key string.
    pub const IDEMPOTENCY_KEYS: &str = "idempotency_keys";

    /// Webhook deliveries, keyed by `source:event_id`.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";

    /// Primary order records, keyed by `order_id` (UUID bytes).
    pub const ORDERS: &str = "orders";

    /// Index: order by payment intent, keyed by `payment_intent_id`.
    /// Value is the 16-byte order ID.
    pub const ORDERS_BY_INTENT: &str = "orders_by_intent";

    /// Checkout session side-table, keyed by `payment_intent_id`.
    pub const CHECKOUT_SESSIONS: &str = "checkout_sessions";

    /// Fulfillment records, keyed by `order_id` (UUID bytes).
    pub const FULFILLMENTS: &str = "fulfillments";

    /// Index: fulfillment by provider order, keyed by `provider_order_id`.
    /// Value is the 16-byte order ID.
    pub const FULFILLMENTS_BY_PROVIDER: &str = "fulfillments_by_provider";

    /// Pending fulfillment jobs, keyed by `order_id` (UUID bytes).
    /// Rows are deleted on completion; whatever remains at startup is
    /// recovered by the dispatcher.
    pub const FULFILLMENT_JOBS: &str = "fulfillment_jobs";

    /// Authoritative variant prices, keyed by variant ID (big-endian u64).
    pub const VARIANT_PRICES: &str = "variant_prices";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::IDEMPOTENCY_KEYS,
        cf::WEBHOOK_EVENTS,
        cf::ORDERS,
        cf::ORDERS_BY_INTENT,
        cf::CHECKOUT_SESSIONS,
        cf::FULFILLMENTS,
        cf::FULFILLMENTS_BY_PROVIDER,
        cf::FULFILLMENT_JOBS,
        cf::VARIANT_PRICES,
    ]
}
