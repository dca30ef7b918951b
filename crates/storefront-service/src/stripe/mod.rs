//! Stripe API integration.
//!
//! Stripe is the payment gateway: the orchestrator creates payment intents
//! here (with a deterministic idempotency key, so checkout retries collapse
//! into one charge attempt) and the webhook endpoint verifies Stripe's
//! signed deliveries.

pub mod client;
pub mod types;

pub use client::{StripeClient, StripeError};
pub use types::{PaymentIntent, StripeErrorResponse};
