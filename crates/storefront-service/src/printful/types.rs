//! Printful API types.
//!
//! Typed request and response structures for the two endpoints the pipeline
//! uses: shipping rate quotes and order creation. Printful wraps every
//! response in `{code, result}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{ShippingAddress, VariantId};

/// Response envelope common to all Printful endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// HTTP-like status code echoed in the body.
    pub code: i64,
    /// The payload.
    pub result: T,
}

/// Shipping rate request body.
#[derive(Debug, Clone, Serialize)]
pub struct RateRequest {
    /// Destination address.
    pub recipient: RateRecipient,
    /// Items to rate.
    pub items: Vec<RateItem>,
}

/// Destination fields the rates endpoint needs.
#[derive(Debug, Clone, Serialize)]
pub struct RateRecipient {
    /// Street address, first line.
    pub address1: String,
    /// City.
    pub city: String,
    /// Two-letter country code.
    pub country_code: String,
    /// State or region code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    /// Postal / ZIP code.
    pub zip: String,
}

impl From<&ShippingAddress> for RateRecipient {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            address1: address.address1.clone(),
            city: address.city.clone(),
            country_code: address.country_code.clone(),
            state_code: address.state_code.clone(),
            zip: address.zip.clone(),
        }
    }
}

/// One line item in a rate request.
#[derive(Debug, Clone, Serialize)]
pub struct RateItem {
    /// Provider variant ID.
    pub variant_id: u64,
    /// Quantity.
    pub quantity: u32,
}

/// One rate option returned by the provider.
///
/// Printful returns the rate as a decimal string, e.g. `"4.99"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRate {
    /// Rate option ID, e.g. `STANDARD`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Cost in major units.
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Earliest delivery estimate in days.
    #[serde(default, rename = "minDeliveryDays")]
    pub min_delivery_days: Option<u32>,
    /// Latest delivery estimate in days.
    #[serde(default, rename = "maxDeliveryDays")]
    pub max_delivery_days: Option<u32>,
}

/// Order creation request body.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Our human-facing order reference, stored on the provider side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Shipping recipient.
    pub recipient: OrderRecipient,
    /// Items to produce and ship.
    pub items: Vec<OrderItem>,
    /// Retail cost breakdown shown on the packing slip.
    pub retail_costs: RetailCosts,
}

/// Full recipient for an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecipient {
    /// Recipient name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Street address, first line.
    pub address1: String,
    /// Street address, second line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// State or region code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    /// Two-letter country code.
    pub country_code: String,
    /// Postal / ZIP code.
    pub zip: String,
    /// Customer email for shipment notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One line item in an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    /// Provider variant ID.
    pub variant_id: u64,
    /// Quantity.
    pub quantity: u32,
    /// Retail unit price, as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub retail_price: Decimal,
}

impl OrderItem {
    /// Build an order item from a variant, quantity, and retail price.
    #[must_use]
    pub fn new(variant_id: VariantId, quantity: u32, retail_price: Decimal) -> Self {
        Self {
            variant_id: variant_id.as_u64(),
            quantity,
            retail_price,
        }
    }
}

/// Retail cost breakdown for the packing slip.
#[derive(Debug, Clone, Serialize)]
pub struct RetailCosts {
    /// Item subtotal, as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    /// Shipping cost, as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub shipping: Decimal,
    /// Charged total, as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// Provider order returned on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOrder {
    /// Provider-side numeric order ID.
    pub id: i64,
    /// Echo of our external ID.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Provider order status, e.g. `draft` or `pending`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned by Printful on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintfulErrorResponse {
    /// HTTP-like status code echoed in the body.
    pub code: i64,
    /// Error details.
    pub error: PrintfulErrorBody,
}

/// Error details inside a Printful error response.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintfulErrorBody {
    /// Human-readable message.
    pub message: String,
    /// Provider error reason.
    #[serde(default)]
    pub reason: Option<String>,
}
