//! Cart snapshots captured at checkout time.
//!
//! A [`CartSnapshot`] is ephemeral: it is constructed per checkout attempt,
//! feeds the payment intent orchestrator, and is never persisted on its own.
//! Its canonical fingerprint seeds the idempotency key that collapses retries
//! of the same logical checkout into one charge attempt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fingerprint;
use crate::ids::VariantId;

/// A shipping destination as collected on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Street address, first line.
    pub address1: String,

    /// Street address, second line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,

    /// City.
    pub city: String,

    /// State or region code (required by some carriers, e.g. US/CA/AU).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,

    /// Two-letter ISO country code.
    pub country_code: String,

    /// Postal / ZIP code.
    pub zip: String,
}

impl ShippingAddress {
    /// Validate the address fields needed to quote shipping.
    ///
    /// Returns the full list of problems rather than stopping at the first,
    /// so the checkout form can surface every missing field at once.
    ///
    /// # Errors
    ///
    /// Returns one message per missing or malformed field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.address1.trim().is_empty() {
            problems.push("Address line is required".to_string());
        }
        if self.city.trim().is_empty() {
            problems.push("City is required".to_string());
        }
        if self.zip.trim().is_empty() {
            problems.push("Postal code is required".to_string());
        }
        let country = self.country_code.trim();
        if country.is_empty() {
            problems.push("Country code is required".to_string());
        } else if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            problems.push(format!(
                "Country code must be a 2-letter code, got '{country}'"
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// A single line item in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Storefront item identifier (product + options, e.g. `tshirt-m-black`).
    pub id: String,

    /// Fulfillment provider variant ID. Absent for discount pseudo-items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,

    /// Quantity ordered.
    pub quantity: u32,

    /// Unit price in major currency units.
    ///
    /// For catalog items this is advisory only; the orchestrator re-resolves
    /// the authoritative price from the variant price table. Discount
    /// pseudo-items carry a (negative) locally-computed price that is used
    /// as-is.
    pub price: Decimal,

    /// Whether this line is a discount adjustment rather than a catalog item.
    #[serde(default)]
    pub is_discount: bool,
}

impl CartItem {
    /// Create a catalog line item.
    #[must_use]
    pub fn catalog(
        id: impl Into<String>,
        variant_id: VariantId,
        quantity: u32,
        price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            variant_id: Some(variant_id),
            quantity,
            price,
            is_discount: false,
        }
    }

    /// Create a discount pseudo-item (negative price, no variant).
    #[must_use]
    pub fn discount(id: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            variant_id: None,
            quantity: 1,
            price,
            is_discount: true,
        }
    }
}

/// The full cart + customer context of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Customer email address.
    pub customer_email: String,

    /// Line items, catalog and discount alike.
    pub items: Vec<CartItem>,

    /// Shipping destination.
    pub shipping_address: ShippingAddress,
}

impl CartSnapshot {
    /// Create a new cart snapshot.
    #[must_use]
    pub fn new(
        customer_email: impl Into<String>,
        items: Vec<CartItem>,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            customer_email: customer_email.into(),
            items,
            shipping_address,
        }
    }

    /// Catalog items only (the lines that ship and price from the catalog).
    pub fn catalog_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| !i.is_discount)
    }

    /// Discount pseudo-items only.
    pub fn discount_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| i.is_discount)
    }

    /// Deterministic idempotency key for this cart + customer combination.
    ///
    /// Two snapshots describing the same logical checkout (same email, items,
    /// quantities, prices, and address) produce the same key, so retried
    /// intent-creation calls collapse into one charge attempt at the gateway.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        fingerprint::cart_idempotency_key(self)
    }
}
