//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding the keys used in column
//! families. String-keyed families use the raw UTF-8 bytes; order-keyed
//! families use the 16 UUID bytes; variant prices use big-endian `u64` so
//! iteration order matches numeric order.

use storefront_core::{OrderId, VariantId};

/// Create an idempotency ledger key.
#[must_use]
pub fn idempotency_key(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

/// Create a webhook event key.
///
/// Format: `source:event_id`. Event IDs are only unique per provider, so the
/// source disambiguates.
#[must_use]
pub fn webhook_event_key(source: &str, event_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(source.len() + 1 + event_id.len());
    key.extend_from_slice(source.as_bytes());
    key.push(b':');
    key.extend_from_slice(event_id.as_bytes());
    key
}

/// Create an order key from an order ID.
#[must_use]
pub fn order_key(order_id: &OrderId) -> Vec<u8> {
    order_id.as_bytes().to_vec()
}

/// Create an order-by-intent index key.
#[must_use]
pub fn order_intent_key(payment_intent_id: &str) -> Vec<u8> {
    payment_intent_id.as_bytes().to_vec()
}

/// Create a checkout session key.
#[must_use]
pub fn checkout_session_key(payment_intent_id: &str) -> Vec<u8> {
    payment_intent_id.as_bytes().to_vec()
}

/// Create a fulfillment key from an order ID.
#[must_use]
pub fn fulfillment_key(order_id: &OrderId) -> Vec<u8> {
    order_id.as_bytes().to_vec()
}

/// Create a fulfillment-by-provider index key.
#[must_use]
pub fn provider_order_key(provider_order_id: &str) -> Vec<u8> {
    provider_order_id.as_bytes().to_vec()
}

/// Create a fulfillment job key from an order ID.
#[must_use]
pub fn fulfillment_job_key(order_id: &OrderId) -> Vec<u8> {
    order_id.as_bytes().to_vec()
}

/// Create a variant price key.
#[must_use]
pub fn variant_price_key(variant_id: VariantId) -> Vec<u8> {
    variant_id.as_u64().to_be_bytes().to_vec()
}

/// Decode the 16-byte order ID stored as an index value.
#[must_use]
pub fn decode_order_id(value: &[u8]) -> Option<OrderId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(OrderId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}
