//! Webhook handlers for Stripe and Printful.
//!
//! Stripe deliveries are at-least-once and unordered. The handler inserts the
//! event row before any processing so a concurrent duplicate loses the insert
//! race and short-circuits; order materialization is guarded by the
//! payment-intent unique insert, so even a crash mid-processing followed by a
//! redelivery converges on exactly one order and one fulfillment job.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{
    CartItem, CartSnapshot, FulfillmentJob, FulfillmentStatus, Order, OrderId, OrderStatus,
    ReadableOrderId, ShippingAddress, TrackingInfo, WebhookEvent,
};
use storefront_store::{Store, StoreError};

use crate::error::ApiError;
use crate::state::AppState;

/// Stripe webhook payload (simplified).
#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    /// Event ID.
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Stripe event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// Event object.
    pub object: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    // Verify signature if a webhook secret is configured
    if state.config.stripe_webhook_secret.is_some() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Signature)?;

        let stripe = state
            .stripe
            .as_ref()
            .ok_or_else(|| ApiError::Internal("Stripe not configured".into()))?;

        stripe.verify_webhook_signature(&body, signature).map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::Signature
        })?;
    } else {
        // No webhook secret configured - skip verification (development mode)
        tracing::warn!("Stripe webhook secret not configured - skipping signature verification");
    }

    let payload: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let webhook: StripeWebhook =
        serde_json::from_value(payload.clone()).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received Stripe webhook"
    );

    // Record the delivery before processing; a duplicate loses the insert
    // race and short-circuits here.
    let event = WebhookEvent::received(&webhook.id, "stripe", &webhook.event_type, payload);
    match state.store.insert_webhook_event(&event) {
        Ok(()) => {}
        Err(StoreError::DuplicateKey { .. }) => {
            tracing::info!(event_id = %webhook.id, "Duplicate webhook delivery");
            // A crash between recording the event and committing the order
            // leaves a recorded event with no order; the redelivery repairs
            // it here before acking.
            if webhook.event_type == "payment_intent.succeeded" {
                match ensure_order(&state, &webhook).await {
                    Ok(_) => {
                        state.store.mark_webhook_processed("stripe", &webhook.id, None)?;
                    }
                    Err(e) => {
                        tracing::error!(event_id = %webhook.id, error = %e, "Repair of duplicate delivery failed");
                        // Repair failures must stay retryable; a 4xx here
                        // would tell the provider to drop the delivery.
                        return Err(ApiError::Internal(e.to_string()));
                    }
                }
            }
            return Ok(Json(WebhookResponse { received: true }));
        }
        Err(e) => return Err(e.into()),
    }

    let result = match webhook.event_type.as_str() {
        "payment_intent.succeeded" => ensure_order(&state, &webhook).await.map(|_| ()),
        "payment_intent.payment_failed" => {
            let intent_id = webhook.data.object.get("id").and_then(|v| v.as_str());
            tracing::warn!(payment_intent_id = ?intent_id, "Payment failed");
            Ok(())
        }
        // Unhandled event types are acked and marked processed so the
        // provider stops retrying them.
        _ => {
            tracing::debug!(event_type = %webhook.event_type, "Unhandled Stripe event");
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            state.store.mark_webhook_processed("stripe", &webhook.id, None)?;
            Ok(Json(WebhookResponse { received: true }))
        }
        Err(e) => {
            // Record the failure and return 500 so Stripe redelivers; the
            // order-uniqueness guard makes the retry safe.
            let message = e.to_string();
            if let Err(mark_err) =
                state
                    .store
                    .mark_webhook_processed("stripe", &webhook.id, Some(message.clone()))
            {
                tracing::error!(event_id = %webhook.id, error = %mark_err, "Failed to record webhook error");
            }
            tracing::error!(event_id = %webhook.id, error = %message, "Webhook processing failed");
            Err(ApiError::Internal(message))
        }
    }
}

/// Materialize the order for a succeeded payment intent, exactly once.
///
/// Safe to call repeatedly: an existing order is returned as-is (with its
/// fulfillment job re-enqueued if a crash dropped it), and a lost insert race
/// resolves to the winner's order.
async fn ensure_order(state: &AppState, webhook: &StripeWebhook) -> Result<Order, ApiError> {
    let object = &webhook.data.object;
    let intent_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Payment intent has no id".into()))?;

    if let Some(existing) = state.store.get_order_by_intent(intent_id)? {
        ensure_fulfillment_job(state, &existing)?;
        return Ok(existing);
    }

    let checkout = load_checkout_data(state, intent_id, object)?;

    let order = Order {
        id: OrderId::generate(),
        payment_intent_id: intent_id.to_string(),
        readable_order_id: ReadableOrderId::generate(),
        customer_email: checkout.cart.customer_email.clone(),
        items: checkout.cart.items.clone(),
        shipping_address: checkout.cart.shipping_address.clone(),
        subtotal: checkout.subtotal,
        shipping_cost: checkout.shipping_cost,
        total_amount: checkout.total,
        currency: checkout.currency.to_uppercase(),
        status: OrderStatus::Paid,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    match state.store.insert_order(&order) {
        Ok(()) => {
            tracing::info!(
                payment_intent_id = %intent_id,
                order_id = %order.id,
                readable_order_id = %order.readable_order_id,
                "Order created"
            );
            ensure_fulfillment_job(state, &order)?;
            Ok(order)
        }
        // Lost the race to a concurrent delivery: the winner's order is the
        // order.
        Err(StoreError::DuplicateKey { .. }) => {
            let winner = state
                .store
                .get_order_by_intent(intent_id)?
                .ok_or_else(|| ApiError::Internal("Order vanished after duplicate insert".into()))?;
            tracing::info!(
                payment_intent_id = %intent_id,
                order_id = %winner.id,
                "Concurrent delivery created the order first"
            );
            Ok(winner)
        }
        Err(e) => Err(e.into()),
    }
}

/// Enqueue the durable fulfillment job unless the order already has a
/// fulfillment or a pending job.
fn ensure_fulfillment_job(state: &AppState, order: &Order) -> Result<(), ApiError> {
    if state.store.get_fulfillment(&order.id)?.is_some() {
        return Ok(());
    }
    if state.store.get_fulfillment_job(&order.id)?.is_none() {
        state
            .store
            .enqueue_fulfillment_job(&FulfillmentJob::new(order.id))?;
    }
    state.dispatcher.notify(order.id);
    Ok(())
}

struct CheckoutData {
    cart: CartSnapshot,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    currency: String,
}

/// Load the checkout payload for an intent: side-table first, metadata as the
/// size-bounded fallback for intents created elsewhere.
fn load_checkout_data(
    state: &AppState,
    intent_id: &str,
    object: &serde_json::Value,
) -> Result<CheckoutData, ApiError> {
    if let Some(session) = state.store.get_checkout_session(intent_id)? {
        return Ok(CheckoutData {
            cart: session.cart,
            subtotal: session.subtotal,
            shipping_cost: session.shipping_cost,
            total: session.total,
            currency: session.currency,
        });
    }

    tracing::warn!(
        payment_intent_id = %intent_id,
        "No checkout session on file, reconstructing from intent metadata"
    );
    checkout_from_metadata(intent_id, object)
}

fn checkout_from_metadata(
    intent_id: &str,
    object: &serde_json::Value,
) -> Result<CheckoutData, ApiError> {
    let metadata = object.get("metadata").cloned().unwrap_or_default();
    let meta_str = |key: &str| -> Option<String> {
        metadata.get(key).and_then(|v| v.as_str()).map(String::from)
    };

    let customer_email = meta_str("customer_email")
        .or_else(|| {
            object
                .get("receipt_email")
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Intent {intent_id} has no customer email on record"))
        })?;

    // The metadata copy may be truncated; a parse failure degrades to an
    // empty item list rather than losing the order.
    let items: Vec<CartItem> = meta_str("items")
        .and_then(|json| serde_json::from_str::<Vec<MetadataItem>>(&json).ok())
        .map(|items| items.into_iter().map(MetadataItem::into_cart_item).collect())
        .unwrap_or_else(|| {
            tracing::warn!(payment_intent_id = %intent_id, "Item metadata missing or truncated");
            Vec::new()
        });

    let shipping_address = ShippingAddress {
        name: meta_str("ship_name"),
        address1: meta_str("address1").unwrap_or_default(),
        address2: meta_str("address2"),
        city: meta_str("city").unwrap_or_default(),
        state_code: meta_str("state_code"),
        country_code: meta_str("country_code").unwrap_or_default(),
        zip: meta_str("zip").unwrap_or_default(),
    };

    let amount = object.get("amount").and_then(serde_json::Value::as_i64).unwrap_or(0);
    let total = Decimal::new(amount, 2);
    let shipping_cost = meta_str("shipping_cost")
        .and_then(|s| s.parse().ok())
        .unwrap_or(Decimal::ZERO);
    let subtotal = meta_str("subtotal")
        .and_then(|s| s.parse().ok())
        .unwrap_or(total - shipping_cost);
    let currency = object
        .get("currency")
        .and_then(|v| v.as_str())
        .unwrap_or("gbp")
        .to_string();

    Ok(CheckoutData {
        cart: CartSnapshot::new(customer_email, items, shipping_address),
        subtotal,
        shipping_cost,
        total,
        currency,
    })
}

/// Compact item representation used in intent metadata.
#[derive(Debug, Deserialize)]
struct MetadataItem {
    id: String,
    #[serde(default)]
    v: Option<u64>,
    q: u32,
    p: String,
}

impl MetadataItem {
    fn into_cart_item(self) -> CartItem {
        CartItem {
            id: self.id,
            variant_id: self.v.map(storefront_core::VariantId::new),
            quantity: self.q,
            price: self.p.parse().unwrap_or(Decimal::ZERO),
            is_discount: self.v.is_none(),
        }
    }
}

/// Printful webhook payload (simplified).
#[derive(Debug, Deserialize)]
pub struct PrintfulWebhook {
    /// Event type, e.g. `package_shipped`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: serde_json::Value,
}

/// Handle Printful shipment status callbacks.
///
/// Printful events carry no unique delivery ID, so they are applied as
/// idempotent status writes instead of being deduplicated: setting the same
/// status twice is a no-op.
pub async fn printful_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<PrintfulWebhook>,
) -> Result<Json<WebhookResponse>, ApiError> {
    tracing::info!(event_type = %webhook.event_type, "Received Printful webhook");

    let Some(status) = FulfillmentStatus::from_provider(&webhook.event_type) else {
        tracing::debug!(event_type = %webhook.event_type, "Unhandled Printful event");
        return Ok(Json(WebhookResponse { received: true }));
    };

    let Some(provider_order_id) = webhook
        .data
        .get("order")
        .and_then(|o| o.get("id"))
        .and_then(serde_json::Value::as_i64)
    else {
        tracing::warn!(event_type = %webhook.event_type, "Printful event has no order id");
        return Ok(Json(WebhookResponse { received: true }));
    };

    let tracking = webhook.data.get("shipment").map(|shipment| TrackingInfo {
        tracking_number: shipment
            .get("tracking_number")
            .and_then(|v| v.as_str())
            .map(String::from),
        tracking_url: shipment
            .get("tracking_url")
            .and_then(|v| v.as_str())
            .map(String::from),
        shipped_at: (status == FulfillmentStatus::Shipped).then(chrono::Utc::now),
    });

    match state.store.update_fulfillment_status(
        &provider_order_id.to_string(),
        status,
        tracking,
    )? {
        Some(fulfillment) => {
            tracing::info!(
                provider_order_id = %provider_order_id,
                order_id = %fulfillment.order_id,
                status = ?fulfillment.status,
                "Fulfillment status updated"
            );
        }
        None => {
            tracing::warn!(
                provider_order_id = %provider_order_id,
                "Status callback for unknown provider order"
            );
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}
