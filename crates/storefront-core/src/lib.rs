//! Core domain types for the storefront checkout pipeline.
//!
//! This crate defines the shared vocabulary of the pipeline: cart snapshots
//! and shipping addresses captured at checkout, orders materialized from
//! successful payments, fulfillment records submitted to the print-on-demand
//! provider, and the deterministic fingerprints that make repeated external
//! calls idempotent.
//!
//! # Example
//!
//! ```
//! use storefront_core::{CartItem, CartSnapshot, ShippingAddress, VariantId};
//! use rust_decimal::Decimal;
//!
//! let address = ShippingAddress {
//!     name: Some("Alice Smith".into()),
//!     address1: "10 Downing Street".into(),
//!     address2: None,
//!     city: "London".into(),
//!     state_code: None,
//!     country_code: "GB".into(),
//!     zip: "SW1A 2AA".into(),
//! };
//!
//! let cart = CartSnapshot::new(
//!     "alice@example.com",
//!     vec![CartItem::catalog("tshirt-m-black", VariantId::new(4017), 2, Decimal::new(2499, 2))],
//!     address,
//! );
//!
//! // Retrying the same logical checkout yields the same idempotency key.
//! assert_eq!(cart.idempotency_key(), cart.idempotency_key());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fingerprint;
pub mod ids;
pub mod money;
pub mod order;
pub mod webhook;

pub use cart::{CartItem, CartSnapshot, ShippingAddress};
pub use catalog::VariantPrice;
pub use checkout::{CheckoutSession, FulfillmentJob, IdempotencyRecord};
pub use fingerprint::{cart_idempotency_key, fulfillment_idempotency_key, salted_idempotency_key};
pub use ids::{IdError, OrderId, ReadableOrderId, VariantId};
pub use money::to_minor_units;
pub use order::{Fulfillment, FulfillmentStatus, Order, OrderStatus, TrackingInfo};
pub use webhook::WebhookEvent;
