//! Printful API integration.
//!
//! Printful is the print-on-demand provider: it quotes carrier shipping rates
//! and fulfills paid orders. All mutating calls carry an `Idempotency-Key`
//! header so provider-side retries never create a second shipment.

pub mod client;
pub mod types;

pub use client::{PrintfulClient, PrintfulError};
pub use types::{
    OrderItem, OrderRecipient, OrderRequest, ProviderOrder, ProviderRate, RateItem, RateRequest,
    RetailCosts,
};
