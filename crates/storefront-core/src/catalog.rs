//! Authoritative catalog pricing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::VariantId;

/// The server-side unit price for one product variant.
///
/// The payment intent orchestrator prices catalog items from this table;
/// client-supplied prices are only honored for discount pseudo-items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPrice {
    /// The variant this price applies to.
    pub variant_id: VariantId,

    /// Unit price in major units.
    pub price: Decimal,

    /// ISO currency code.
    pub currency: String,

    /// When the price was last synced.
    pub updated_at: DateTime<Utc>,
}

impl VariantPrice {
    /// Create a price record stamped now.
    #[must_use]
    pub fn new(variant_id: VariantId, price: Decimal, currency: impl Into<String>) -> Self {
        Self {
            variant_id,
            price,
            currency: currency.into(),
            updated_at: Utc::now(),
        }
    }
}
