//! Storefront HTTP API Service.
//!
//! This crate provides the HTTP API for the storefront checkout pipeline:
//!
//! - Shipping rate quotes (with caching and a flat-rate fallback)
//! - Payment intent creation (idempotent, server-priced)
//! - Stripe webhooks (order materialization, exactly-once)
//! - Printful webhooks (shipment status updates)
//!
//! # Delivery guarantees
//!
//! Webhooks arrive at-least-once and out of order; every mutating path is
//! guarded by a store-level unique insert so duplicates collapse instead of
//! double-charging, double-ordering, or double-shipping.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Webhook handlers need async for consistency

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fulfillment;
pub mod handlers;
pub mod printful;
pub mod routes;
pub mod shipping;
pub mod state;
pub mod stripe;

pub use cache::{MemoryQuoteCache, QuoteCache};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use fulfillment::FulfillmentDispatcher;
pub use printful::{PrintfulClient, PrintfulError};
pub use routes::create_router;
pub use shipping::{RateGateway, ShippingOption, ShippingQuote};
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
