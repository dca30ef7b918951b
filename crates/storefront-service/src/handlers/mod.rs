//! API handlers.

pub mod checkout;
pub mod health;
pub mod shipping;
pub mod webhooks;
