//! `RocksDB` storage layer for the storefront checkout pipeline.
//!
//! This crate provides persistent storage for the idempotency ledger, webhook
//! event log, orders, fulfillments, the durable fulfillment job queue, and
//! the authoritative variant price table, using `RocksDB` with column
//! families for indexing.
//!
//! # Uniqueness
//!
//! The pipeline's exactly-once guarantees rest on first-writer-wins inserts:
//! `insert_webhook_event`, `insert_order`, `insert_fulfillment`, and
//! `record_idempotency` fail with [`StoreError::DuplicateKey`] when the key
//! already exists, and callers read back the winner instead of writing a
//! second row. A pre-read is never the guard.
//!
//! # Architecture
//!
//! Column families:
//!
//! - `idempotency_keys`: ledger records, keyed by idempotency key
//! - `webhook_events`: deliveries, keyed by `source:event_id`
//! - `orders` / `orders_by_intent`: orders with a payment-intent index
//! - `checkout_sessions`: full checkout payloads, keyed by intent ID
//! - `fulfillments` / `fulfillments_by_provider`: fulfillments with a
//!   provider-order index
//! - `fulfillment_jobs`: pending dispatch jobs, deleted on completion
//! - `variant_prices`: catalog prices, keyed by variant ID
//!
//! # Example
//!
//! ```no_run
//! use storefront_store::{RocksStore, Store, StoreError};
//! use storefront_core::WebhookEvent;
//!
//! let store = RocksStore::open("/tmp/storefront-db").unwrap();
//!
//! let event = WebhookEvent::received("evt_1", "stripe", "payment_intent.succeeded",
//!     serde_json::json!({}));
//! store.insert_webhook_event(&event).unwrap();
//!
//! // A redelivery loses the insert race.
//! let dup = store.insert_webhook_event(&event);
//! assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use storefront_core::{
    CheckoutSession, Fulfillment, FulfillmentJob, FulfillmentStatus, IdempotencyRecord, Order,
    OrderId, TrackingInfo, VariantPrice, WebhookEvent,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Idempotency Ledger
    // =========================================================================

    /// Look up an idempotency record by key.
    ///
    /// A miss is not an error; records past their expiry read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn check_idempotency(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Record an idempotency result under a unique key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if an unexpired record already
    /// holds the key.
    fn record_idempotency(&self, record: &IdempotencyRecord) -> Result<()>;

    // =========================================================================
    // Webhook Events
    // =========================================================================

    /// Insert a webhook event row before processing begins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if this delivery was already
    /// recorded.
    fn insert_webhook_event(&self, event: &WebhookEvent) -> Result<()>;

    /// Get a webhook event by source and event ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_webhook_event(&self, source: &str, event_id: &str) -> Result<Option<WebhookEvent>>;

    /// Mark a webhook event as processed, recording any handling error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the event row doesn't exist.
    fn mark_webhook_processed(
        &self,
        source: &str,
        event_id: &str,
        error: Option<String>,
    ) -> Result<()>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert an order, enforcing payment-intent uniqueness.
    ///
    /// This also maintains the intent index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if an order already exists for the
    /// payment intent.
    fn insert_order(&self, order: &Order) -> Result<()>;

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Get an order by payment intent ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>>;

    // =========================================================================
    // Checkout Sessions
    // =========================================================================

    /// Insert or replace the checkout session for a payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_checkout_session(&self, session: &CheckoutSession) -> Result<()>;

    /// Get the checkout session for a payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_checkout_session(&self, payment_intent_id: &str) -> Result<Option<CheckoutSession>>;

    // =========================================================================
    // Fulfillments
    // =========================================================================

    /// Insert a fulfillment record, enforcing one per order.
    ///
    /// This also maintains the provider-order index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the order already has a
    /// fulfillment.
    fn insert_fulfillment(&self, fulfillment: &Fulfillment) -> Result<()>;

    /// Get the fulfillment for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_fulfillment(&self, order_id: &OrderId) -> Result<Option<Fulfillment>>;

    /// Update the fulfillment matched by provider order ID.
    ///
    /// Returns the updated record, or `None` if no fulfillment matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn update_fulfillment_status(
        &self,
        provider_order_id: &str,
        status: FulfillmentStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<Option<Fulfillment>>;

    // =========================================================================
    // Fulfillment Job Queue
    // =========================================================================

    /// Enqueue (or re-enqueue with updated attempts) a fulfillment job.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn enqueue_fulfillment_job(&self, job: &FulfillmentJob) -> Result<()>;

    /// Get the pending fulfillment job for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_fulfillment_job(&self, order_id: &OrderId) -> Result<Option<FulfillmentJob>>;

    /// List all pending fulfillment jobs, for startup recovery.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pending_fulfillment_jobs(&self) -> Result<Vec<FulfillmentJob>>;

    /// Remove a completed fulfillment job. Removing an absent job is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn complete_fulfillment_job(&self, order_id: &OrderId) -> Result<()>;

    // =========================================================================
    // Variant Prices
    // =========================================================================

    /// Insert or update an authoritative variant price.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_variant_price(&self, price: &VariantPrice) -> Result<()>;

    /// Get the authoritative price for a variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_variant_price(
        &self,
        variant_id: storefront_core::VariantId,
    ) -> Result<Option<VariantPrice>>;
}
