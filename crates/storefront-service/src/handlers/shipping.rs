//! Shipping rate quote handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use storefront_core::{CartItem, ShippingAddress};

use crate::error::ApiError;
use crate::shipping::ShippingQuote;
use crate::state::AppState;

/// Shipping rate request body.
#[derive(Debug, Deserialize)]
pub struct RateQuoteRequest {
    /// Destination address.
    pub recipient: ShippingAddress,
    /// Cart items to rate.
    pub items: Vec<CartItem>,
}

/// Quote shipping rates for a cart and destination.
pub async fn quote_rates(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RateQuoteRequest>,
) -> Result<Json<ShippingQuote>, ApiError> {
    let quote = state
        .shipping
        .get_shipping_rates(&request.recipient, &request.items)
        .await?;

    Ok(Json(quote))
}
