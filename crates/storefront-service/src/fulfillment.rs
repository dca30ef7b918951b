//! Fulfillment dispatcher.
//!
//! A background worker fed by the durable job queue. The webhook handler
//! persists a job row and pings the dispatcher; the worker submits the order
//! to the provider and records the fulfillment. Jobs still pending at startup
//! are recovered before new notifications are drained, so a crash between
//! "order committed" and "fulfillment submitted" loses nothing.
//!
//! A provider failure is logged against the order and the job stays pending
//! for remediation (it will be retried at the next startup); the order stays
//! paid and nothing is rolled back.

use std::sync::Arc;

use tokio::sync::mpsc;

use storefront_core::{
    fulfillment_idempotency_key, Fulfillment, FulfillmentJob, Order, OrderId,
};
use storefront_store::{RocksStore, Store, StoreError};

use crate::printful::{OrderItem, OrderRecipient, OrderRequest, PrintfulClient, RetailCosts};

/// Handle for enqueueing fulfillment work.
#[derive(Clone)]
pub struct FulfillmentDispatcher {
    tx: mpsc::UnboundedSender<OrderId>,
}

impl FulfillmentDispatcher {
    /// Start the dispatcher worker.
    ///
    /// Recovers any jobs left pending by a previous run, then drains
    /// notifications from [`notify`](Self::notify).
    #[must_use]
    pub fn start(store: Arc<RocksStore>, printful: Option<Arc<PrintfulClient>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(store, printful, rx));

        Self { tx }
    }

    /// Ping the worker about a newly-enqueued job.
    ///
    /// The job row is already durable; a lost notification only delays the
    /// submission until the next startup recovery.
    pub fn notify(&self, order_id: OrderId) {
        if self.tx.send(order_id).is_err() {
            tracing::error!(order_id = %order_id, "Fulfillment worker is gone; job stays pending");
        }
    }
}

async fn run_worker(
    store: Arc<RocksStore>,
    printful: Option<Arc<PrintfulClient>>,
    mut rx: mpsc::UnboundedReceiver<OrderId>,
) {
    match store.list_pending_fulfillment_jobs() {
        Ok(jobs) => {
            if !jobs.is_empty() {
                tracing::info!(count = jobs.len(), "Recovering pending fulfillment jobs");
            }
            for job in jobs {
                process_job(&store, printful.as_deref(), job.order_id).await;
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list pending fulfillment jobs at startup");
        }
    }

    while let Some(order_id) = rx.recv().await {
        process_job(&store, printful.as_deref(), order_id).await;
    }
}

async fn process_job(store: &RocksStore, printful: Option<&PrintfulClient>, order_id: OrderId) {
    // Already fulfilled: a duplicate notification or a crash after submission.
    match store.get_fulfillment(&order_id) {
        Ok(Some(_)) => {
            complete_job(store, &order_id);
            return;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Failed to read fulfillment");
            return;
        }
    }

    let order = match store.get_order(&order_id) {
        Ok(Some(order)) => order,
        Ok(None) => {
            tracing::error!(order_id = %order_id, "Fulfillment job references a missing order");
            complete_job(store, &order_id);
            return;
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Failed to read order");
            return;
        }
    };

    let Some(printful) = printful else {
        tracing::error!(
            order_id = %order_id,
            readable_order_id = %order.readable_order_id,
            "Printful not configured; fulfillment job stays pending"
        );
        record_attempt(store, &order_id);
        return;
    };

    match submit_fulfillment(store, printful, &order).await {
        Ok(fulfillment) => {
            tracing::info!(
                order_id = %order_id,
                readable_order_id = %order.readable_order_id,
                provider_order_id = %fulfillment.provider_order_id,
                "Fulfillment submitted"
            );
            complete_job(store, &order_id);
        }
        Err(e) => {
            tracing::error!(
                order_id = %order_id,
                readable_order_id = %order.readable_order_id,
                error = %e,
                "Fulfillment submission failed; order stays paid, job stays pending"
            );
            record_attempt(store, &order_id);
        }
    }
}

/// Submit one order to the provider and record the fulfillment row.
///
/// The provider idempotency key is derived solely from the order ID, so a
/// retried submission replays the original provider order.
async fn submit_fulfillment(
    store: &RocksStore,
    printful: &PrintfulClient,
    order: &Order,
) -> Result<Fulfillment, String> {
    let items: Vec<OrderItem> = order
        .items
        .iter()
        .filter(|i| !i.is_discount)
        .filter_map(|i| i.variant_id.map(|v| OrderItem::new(v, i.quantity, i.price)))
        .collect();

    if items.is_empty() {
        return Err("order has no fulfillable items".to_string());
    }

    let request = OrderRequest {
        external_id: Some(order.readable_order_id.to_string()),
        recipient: OrderRecipient {
            name: order.shipping_address.name.clone(),
            address1: order.shipping_address.address1.clone(),
            address2: order.shipping_address.address2.clone(),
            city: order.shipping_address.city.clone(),
            state_code: order.shipping_address.state_code.clone(),
            country_code: order.shipping_address.country_code.clone(),
            zip: order.shipping_address.zip.clone(),
            email: Some(order.customer_email.clone()),
        },
        items,
        retail_costs: RetailCosts {
            subtotal: order.subtotal,
            shipping: order.shipping_cost,
            total: order.total_amount,
        },
    };

    let idempotency_key = fulfillment_idempotency_key(&order.id);
    let provider_order = printful
        .create_order(&request, &idempotency_key)
        .await
        .map_err(|e| e.to_string())?;

    let fulfillment = Fulfillment::submitted(order.id, provider_order.id.to_string());
    match store.insert_fulfillment(&fulfillment) {
        Ok(()) => Ok(fulfillment),
        // A concurrent submission won; the provider call was idempotent, so
        // both sides refer to the same shipment.
        Err(StoreError::DuplicateKey { .. }) => store
            .get_fulfillment(&order.id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "fulfillment vanished after duplicate insert".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn complete_job(store: &RocksStore, order_id: &OrderId) {
    if let Err(e) = store.complete_fulfillment_job(order_id) {
        tracing::error!(order_id = %order_id, error = %e, "Failed to complete fulfillment job");
    }
}

fn record_attempt(store: &RocksStore, order_id: &OrderId) {
    let job = match store.get_fulfillment_job(order_id) {
        Ok(Some(mut job)) => {
            job.attempts += 1;
            job
        }
        Ok(None) => {
            let mut job = FulfillmentJob::new(*order_id);
            job.attempts = 1;
            job
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Failed to read fulfillment job");
            return;
        }
    };

    if let Err(e) = store.enqueue_fulfillment_job(&job) {
        tracing::error!(order_id = %order_id, error = %e, "Failed to record fulfillment attempt");
    }
}
