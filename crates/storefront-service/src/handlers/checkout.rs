//! Payment intent orchestrator.
//!
//! Prices the cart server-side, quotes shipping, creates the gateway payment
//! intent under a deterministic idempotency key, and persists the checkout
//! session side-table row the webhook processor reads back later.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{
    to_minor_units, CartItem, CartSnapshot, CheckoutSession, IdempotencyRecord, ShippingAddress,
};
use storefront_store::{Store, StoreError};

use crate::error::ApiError;
use crate::state::AppState;

/// Stripe caps each metadata value at 500 characters; the item summary is
/// truncated to stay inside it. The full payload lives in the checkout
/// session side-table, so truncation only degrades the fallback path.
const METADATA_ITEMS_MAX_CHARS: usize = 450;

/// Payment intent request body.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Cart items, catalog and discount alike.
    pub items: Vec<CartItem>,
    /// Shipping destination.
    pub shipping_address: ShippingAddress,
    /// Customer email.
    pub customer_email: String,
    /// ISO currency code; defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Payment intent response body.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    /// Client secret for confirming the payment in the browser.
    pub client_secret: String,
    /// Charged amount in minor units.
    pub amount: i64,
    /// ISO currency code (lowercase).
    pub currency: String,
    /// Shipping cost in major units.
    pub shipping_cost: Decimal,
    /// Item subtotal in major units.
    pub subtotal: Decimal,
    /// Charged total in major units.
    pub total: Decimal,
    /// Gateway payment intent ID.
    pub payment_intent_id: String,
}

/// Create a payment intent for a cart.
///
/// Retrying the same logical checkout (same email, items, address) reuses the
/// stored result from the idempotency ledger; at the gateway the same
/// deterministic key collapses concurrent attempts into one intent.
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_request(&request)?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::Gateway("Payment gateway not configured".into()))?;

    let currency = request
        .currency
        .clone()
        .unwrap_or_else(|| state.config.currency.clone())
        .to_lowercase();

    let items = resolve_prices(&state, request.items.clone());
    let cart = CartSnapshot::new(
        request.customer_email.clone(),
        items,
        request.shipping_address.clone(),
    );

    let idempotency_key = cart.idempotency_key();

    // Replay a previous result for the same logical checkout.
    if let Some(record) = state.store.check_idempotency(&idempotency_key)? {
        tracing::info!(key = %idempotency_key, "Replaying stored checkout result");
        return Ok(Json(record.result));
    }

    let subtotal: Decimal = cart
        .items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum();

    let quote = state
        .shipping
        .get_shipping_rates(&cart.shipping_address, &cart.items)
        .await?;
    let shipping_cost = quote
        .cheapest()
        .map(|o| o.rate)
        .ok_or_else(|| ApiError::Internal("No shipping option available".into()))?;

    let total = subtotal + shipping_cost;
    let amount = to_minor_units(total)
        .filter(|a| *a > 0)
        .ok_or_else(|| ApiError::Validation(vec!["Order total must be positive".to_string()]))?;

    let metadata = build_metadata(&cart, subtotal, shipping_cost);

    let intent = stripe
        .create_payment_intent(
            amount,
            &currency,
            &idempotency_key,
            Some(&cart.customer_email),
            &metadata,
        )
        .await?;

    let client_secret = intent
        .client_secret
        .clone()
        .ok_or_else(|| ApiError::Gateway("Gateway returned no client secret".into()))?;

    // Side-table row the webhook processor reads back; the metadata above is
    // only the size-bounded fallback.
    let session = CheckoutSession {
        payment_intent_id: intent.id.clone(),
        cart: cart.clone(),
        subtotal,
        shipping_cost,
        total,
        currency: currency.clone(),
        created_at: chrono::Utc::now(),
    };
    state.store.put_checkout_session(&session)?;

    let response = PaymentIntentResponse {
        client_secret,
        amount,
        currency,
        shipping_cost,
        subtotal,
        total,
        payment_intent_id: intent.id.clone(),
    };
    let response = serde_json::to_value(&response)
        .map_err(|e| ApiError::Internal(format!("response serialization: {e}")))?;

    // Ledger write failures other than duplication are logged, not fatal:
    // the gateway-side idempotency key still guards against a double charge.
    match state
        .store
        .record_idempotency(&IdempotencyRecord::new(&idempotency_key, response.clone()))
    {
        Ok(()) => {}
        Err(StoreError::DuplicateKey { .. }) => {
            tracing::debug!(key = %idempotency_key, "Concurrent checkout recorded the ledger entry first");
        }
        Err(e) => {
            tracing::warn!(key = %idempotency_key, error = %e, "Failed to record idempotency result");
        }
    }

    tracing::info!(
        payment_intent_id = %intent.id,
        amount = %amount,
        subtotal = %subtotal,
        shipping_cost = %shipping_cost,
        "Payment intent created"
    );

    Ok(Json(response))
}

/// Collect every validation problem before rejecting.
fn validate_request(request: &CreatePaymentIntentRequest) -> Result<(), ApiError> {
    let mut problems = Vec::new();

    if request.items.is_empty() {
        problems.push("At least one item is required".to_string());
    }
    if request.items.iter().any(|i| !i.is_discount && i.quantity == 0) {
        problems.push("Item quantity must be at least 1".to_string());
    }
    let email = request.customer_email.trim();
    if email.is_empty() {
        problems.push("Customer email is required".to_string());
    } else if !email.contains('@') {
        problems.push("Customer email is invalid".to_string());
    }
    if let Err(address_problems) = request.shipping_address.validate() {
        problems.extend(address_problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(problems))
    }
}

/// Replace client-supplied catalog prices with the authoritative variant
/// price where one is on file. Discount pseudo-items keep the caller price.
fn resolve_prices(state: &AppState, mut items: Vec<CartItem>) -> Vec<CartItem> {
    for item in &mut items {
        if item.is_discount {
            continue;
        }
        let Some(variant_id) = item.variant_id else {
            continue;
        };
        match state.store.get_variant_price(variant_id) {
            Ok(Some(authoritative)) => {
                if authoritative.price != item.price {
                    tracing::warn!(
                        item_id = %item.id,
                        variant_id = %variant_id,
                        client_price = %item.price,
                        catalog_price = %authoritative.price,
                        "Client price disagrees with catalog, using catalog price"
                    );
                }
                item.price = authoritative.price;
            }
            Ok(None) => {
                tracing::warn!(
                    item_id = %item.id,
                    variant_id = %variant_id,
                    "No catalog price on file, trusting client price"
                );
            }
            Err(e) => {
                tracing::error!(variant_id = %variant_id, error = %e, "Variant price lookup failed");
            }
        }
    }
    items
}

/// Size-bounded metadata copy of the checkout, for the gateway intent.
fn build_metadata(
    cart: &CartSnapshot,
    subtotal: Decimal,
    shipping_cost: Decimal,
) -> Vec<(String, String)> {
    let items_summary: Vec<serde_json::Value> = cart
        .items
        .iter()
        .map(|i| {
            serde_json::json!({
                "id": i.id,
                "v": i.variant_id.map(|v| v.as_u64()),
                "q": i.quantity,
                "p": i.price.to_string(),
            })
        })
        .collect();
    let mut items_json =
        serde_json::to_string(&items_summary).unwrap_or_else(|_| "[]".to_string());
    if items_json.len() > METADATA_ITEMS_MAX_CHARS {
        let mut cut = METADATA_ITEMS_MAX_CHARS;
        while !items_json.is_char_boundary(cut) {
            cut -= 1;
        }
        items_json.truncate(cut);
    }

    let address = &cart.shipping_address;
    let mut metadata = vec![
        ("customer_email".to_string(), cart.customer_email.clone()),
        ("items".to_string(), items_json),
        ("subtotal".to_string(), subtotal.to_string()),
        ("shipping_cost".to_string(), shipping_cost.to_string()),
        ("address1".to_string(), address.address1.clone()),
        ("city".to_string(), address.city.clone()),
        ("country_code".to_string(), address.country_code.clone()),
        ("zip".to_string(), address.zip.clone()),
    ];
    if let Some(name) = &address.name {
        metadata.push(("ship_name".to_string(), name.clone()));
    }
    if let Some(address2) = &address.address2 {
        metadata.push(("address2".to_string(), address2.clone()));
    }
    if let Some(state_code) = &address.state_code {
        metadata.push(("state_code".to_string(), state_code.clone()));
    }
    metadata
}
