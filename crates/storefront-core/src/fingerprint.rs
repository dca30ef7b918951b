//! Deterministic fingerprints for idempotency keys.
//!
//! Cart-bound keys are derived by hashing a canonicalized structure of
//! customer email + item lines + address components. Canonicalization sorts
//! items by storefront ID so the key is independent of cart insertion order.
//! The cart key is deliberately timestamp-free: a retry of the same logical
//! checkout must collide with the original. [`salted_idempotency_key`] exists
//! for callers that want per-attempt uniqueness instead.

use sha2::{Digest, Sha256};

use crate::cart::CartSnapshot;

/// Number of hex characters of the digest kept in derived keys.
const KEY_DIGEST_LEN: usize = 16;

/// Derive the deterministic idempotency key for a cart + customer combination.
///
/// Changing any item ID, variant, quantity, price, or any address component
/// that affects shipping (address line, city, country, zip) changes the key.
#[must_use]
pub fn cart_idempotency_key(cart: &CartSnapshot) -> String {
    let mut lines: Vec<String> = cart
        .items
        .iter()
        .map(|item| {
            format!(
                "{}|{}|{}|{}",
                item.id,
                item.variant_id.map_or(0, |v| v.as_u64()),
                item.quantity,
                item.price.normalize(),
            )
        })
        .collect();
    lines.sort_unstable();

    let addr = &cart.shipping_address;
    let canonical = format!(
        "{}\n{}\n{}|{}|{}|{}",
        cart.customer_email.trim().to_ascii_lowercase(),
        lines.join("\n"),
        addr.address1.trim(),
        addr.city.trim(),
        addr.country_code.trim().to_ascii_uppercase(),
        addr.zip.trim(),
    );

    format!("cart_{}", short_digest(canonical.as_bytes()))
}

/// Derive the provider-facing idempotency key for a fulfillment submission.
///
/// Keyed solely by the order ID: retrying submission for the same order
/// always presents the same key, so the provider acknowledges the existing
/// shipment instead of creating a second one.
#[must_use]
pub fn fulfillment_idempotency_key(order_id: &crate::OrderId) -> String {
    format!("fulfill_{order_id}")
}

/// Derive a per-attempt key by salting a base key with a timestamp.
///
/// Used where each attempt must be genuinely unique rather than collapsing
/// retries.
#[must_use]
pub fn salted_idempotency_key(base: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    let salted = format!("{base}@{}", at.timestamp_millis());
    format!("{base}_{}", short_digest(salted.as_bytes()))
}

fn short_digest(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut hex = hex::encode(digest);
    hex.truncate(KEY_DIGEST_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartItem, OrderId, ShippingAddress, VariantId};
    use rust_decimal::Decimal;

    fn uk_address() -> ShippingAddress {
        ShippingAddress {
            name: Some("Alice Smith".into()),
            address1: "10 Downing Street".into(),
            address2: None,
            city: "London".into(),
            state_code: None,
            country_code: "GB".into(),
            zip: "SW1A 2AA".into(),
        }
    }

    fn cart() -> CartSnapshot {
        CartSnapshot::new(
            "alice@example.com",
            vec![
                CartItem::catalog("tshirt-m-black", VariantId::new(4017), 2, Decimal::new(1000, 2)),
                CartItem::catalog("mug", VariantId::new(1320), 1, Decimal::new(500, 2)),
            ],
            uk_address(),
        )
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(cart().idempotency_key(), cart().idempotency_key());
    }

    #[test]
    fn key_is_item_order_independent() {
        let mut reordered = cart();
        reordered.items.reverse();
        assert_eq!(cart().idempotency_key(), reordered.idempotency_key());
    }

    #[test]
    fn key_changes_with_quantity() {
        let mut changed = cart();
        changed.items[0].quantity = 3;
        assert_ne!(cart().idempotency_key(), changed.idempotency_key());
    }

    #[test]
    fn key_changes_with_price() {
        let mut changed = cart();
        changed.items[0].price = Decimal::new(1001, 2);
        assert_ne!(cart().idempotency_key(), changed.idempotency_key());
    }

    #[test]
    fn key_changes_with_address() {
        let mut changed = cart();
        changed.shipping_address.zip = "SW1A 1AA".into();
        assert_ne!(cart().idempotency_key(), changed.idempotency_key());
    }

    #[test]
    fn key_ignores_email_case() {
        let mut changed = cart();
        changed.customer_email = "ALICE@example.com".into();
        assert_eq!(cart().idempotency_key(), changed.idempotency_key());
    }

    #[test]
    fn fulfillment_key_is_stable_per_order() {
        let order_id = OrderId::generate();
        assert_eq!(
            fulfillment_idempotency_key(&order_id),
            fulfillment_idempotency_key(&order_id)
        );
    }

    #[test]
    fn salted_key_differs_per_attempt() {
        let t1 = chrono::DateTime::from_timestamp_millis(1_000).unwrap();
        let t2 = chrono::DateTime::from_timestamp_millis(2_000).unwrap();
        assert_ne!(
            salted_idempotency_key("cart_abc", t1),
            salted_idempotency_key("cart_abc", t2)
        );
    }
}
