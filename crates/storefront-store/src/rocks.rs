//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//!
//! `RocksDB` has no native unique constraint, so the first-writer-wins insert
//! paths run their read-then-put under a process-wide mutex. The critical
//! sections touch only the local database; no lock is held across a network
//! call.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use storefront_core::{
    CheckoutSession, Fulfillment, FulfillmentJob, FulfillmentStatus, IdempotencyRecord, Order,
    OrderId, TrackingInfo, VariantId, VariantPrice, WebhookEvent,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    insert_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            insert_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        self.get_raw(cf_name, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let data = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, data)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Insert a value only if the key is absent.
    ///
    /// The read-then-put runs under the insert lock so concurrent inserts of
    /// the same key serialize; exactly one wins, the rest get `DuplicateKey`.
    fn insert_unique<T: serde::Serialize>(
        &self,
        cf_name: &'static str,
        key: &[u8],
        display_key: &str,
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let data = Self::serialize(value)?;

        let _guard = self
            .insert_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Err(StoreError::DuplicateKey {
                keyspace: cf_name,
                key: display_key.to_string(),
            });
        }

        self.db
            .put_cf(&cf, key, data)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Idempotency Ledger
    // =========================================================================

    fn check_idempotency(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let record: Option<IdempotencyRecord> =
            self.get_value(cf::IDEMPOTENCY_KEYS, &keys::idempotency_key(key))?;

        // Lazy expiry: stale records read as absent.
        Ok(record.filter(|r| !r.is_expired_at(chrono::Utc::now())))
    }

    fn record_idempotency(&self, record: &IdempotencyRecord) -> Result<()> {
        let cf = self.cf(cf::IDEMPOTENCY_KEYS)?;
        let key = keys::idempotency_key(&record.key);
        let data = Self::serialize(record)?;

        let _guard = self
            .insert_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let existing: Option<IdempotencyRecord> = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()?;

        // An expired record no longer protects its key; overwrite it.
        if let Some(existing) = existing {
            if !existing.is_expired_at(chrono::Utc::now()) {
                return Err(StoreError::DuplicateKey {
                    keyspace: cf::IDEMPOTENCY_KEYS,
                    key: record.key.clone(),
                });
            }
        }

        self.db
            .put_cf(&cf, key, data)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Webhook Events
    // =========================================================================

    fn insert_webhook_event(&self, event: &WebhookEvent) -> Result<()> {
        let key = keys::webhook_event_key(&event.source, &event.event_id);
        self.insert_unique(cf::WEBHOOK_EVENTS, &key, &event.event_id, event)
    }

    fn get_webhook_event(&self, source: &str, event_id: &str) -> Result<Option<WebhookEvent>> {
        self.get_value(cf::WEBHOOK_EVENTS, &keys::webhook_event_key(source, event_id))
    }

    fn mark_webhook_processed(
        &self,
        source: &str,
        event_id: &str,
        error: Option<String>,
    ) -> Result<()> {
        let key = keys::webhook_event_key(source, event_id);
        let mut event: WebhookEvent = self
            .get_value(cf::WEBHOOK_EVENTS, &key)?
            .ok_or(StoreError::NotFound)?;

        event.processed = true;
        event.processed_at = Some(chrono::Utc::now());
        event.error = error;

        self.put_value(cf::WEBHOOK_EVENTS, &key, &event)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    fn insert_order(&self, order: &Order) -> Result<()> {
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_intent = self.cf(cf::ORDERS_BY_INTENT)?;

        let order_key = keys::order_key(&order.id);
        let intent_key = keys::order_intent_key(&order.payment_intent_id);
        let value = Self::serialize(order)?;

        let _guard = self
            .insert_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Uniqueness lives on the intent: one order per payment.
        let taken = self
            .db
            .get_cf(&cf_by_intent, &intent_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(StoreError::DuplicateKey {
                keyspace: cf::ORDERS_BY_INTENT,
                key: order.payment_intent_id.clone(),
            });
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orders, &order_key, &value);
        batch.put_cf(&cf_by_intent, &intent_key, order.id.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.get_value(cf::ORDERS, &keys::order_key(order_id))
    }

    fn get_order_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>> {
        let Some(value) =
            self.get_raw(cf::ORDERS_BY_INTENT, &keys::order_intent_key(payment_intent_id))?
        else {
            return Ok(None);
        };

        let order_id = keys::decode_order_id(&value).ok_or_else(|| {
            StoreError::Serialization(format!(
                "corrupt order index entry for intent {payment_intent_id}"
            ))
        })?;

        self.get_order(&order_id)
    }

    // =========================================================================
    // Checkout Sessions
    // =========================================================================

    fn put_checkout_session(&self, session: &CheckoutSession) -> Result<()> {
        self.put_value(
            cf::CHECKOUT_SESSIONS,
            &keys::checkout_session_key(&session.payment_intent_id),
            session,
        )
    }

    fn get_checkout_session(&self, payment_intent_id: &str) -> Result<Option<CheckoutSession>> {
        self.get_value(
            cf::CHECKOUT_SESSIONS,
            &keys::checkout_session_key(payment_intent_id),
        )
    }

    // =========================================================================
    // Fulfillments
    // =========================================================================

    fn insert_fulfillment(&self, fulfillment: &Fulfillment) -> Result<()> {
        let cf_fulfillments = self.cf(cf::FULFILLMENTS)?;
        let cf_by_provider = self.cf(cf::FULFILLMENTS_BY_PROVIDER)?;

        let fulfillment_key = keys::fulfillment_key(&fulfillment.order_id);
        let provider_key = keys::provider_order_key(&fulfillment.provider_order_id);
        let value = Self::serialize(fulfillment)?;

        let _guard = self
            .insert_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let taken = self
            .db
            .get_cf(&cf_fulfillments, &fulfillment_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(StoreError::DuplicateKey {
                keyspace: cf::FULFILLMENTS,
                key: fulfillment.order_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_fulfillments, &fulfillment_key, &value);
        batch.put_cf(&cf_by_provider, &provider_key, fulfillment.order_id.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_fulfillment(&self, order_id: &OrderId) -> Result<Option<Fulfillment>> {
        self.get_value(cf::FULFILLMENTS, &keys::fulfillment_key(order_id))
    }

    fn update_fulfillment_status(
        &self,
        provider_order_id: &str,
        status: FulfillmentStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<Option<Fulfillment>> {
        let Some(value) = self.get_raw(
            cf::FULFILLMENTS_BY_PROVIDER,
            &keys::provider_order_key(provider_order_id),
        )?
        else {
            return Ok(None);
        };

        let order_id = keys::decode_order_id(&value).ok_or_else(|| {
            StoreError::Serialization(format!(
                "corrupt fulfillment index entry for provider order {provider_order_id}"
            ))
        })?;

        let Some(mut fulfillment) = self.get_fulfillment(&order_id)? else {
            return Ok(None);
        };

        fulfillment.status = status;
        if tracking.is_some() {
            fulfillment.tracking = tracking;
        }
        fulfillment.updated_at = chrono::Utc::now();

        self.put_value(
            cf::FULFILLMENTS,
            &keys::fulfillment_key(&order_id),
            &fulfillment,
        )?;

        Ok(Some(fulfillment))
    }

    // =========================================================================
    // Fulfillment Job Queue
    // =========================================================================

    fn enqueue_fulfillment_job(&self, job: &FulfillmentJob) -> Result<()> {
        self.put_value(
            cf::FULFILLMENT_JOBS,
            &keys::fulfillment_job_key(&job.order_id),
            job,
        )
    }

    fn get_fulfillment_job(&self, order_id: &OrderId) -> Result<Option<FulfillmentJob>> {
        self.get_value(cf::FULFILLMENT_JOBS, &keys::fulfillment_job_key(order_id))
    }

    fn list_pending_fulfillment_jobs(&self) -> Result<Vec<FulfillmentJob>> {
        let cf = self.cf(cf::FULFILLMENT_JOBS)?;
        let mut jobs = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            jobs.push(Self::deserialize(&value)?);
        }

        Ok(jobs)
    }

    fn complete_fulfillment_job(&self, order_id: &OrderId) -> Result<()> {
        let cf = self.cf(cf::FULFILLMENT_JOBS)?;
        self.db
            .delete_cf(&cf, keys::fulfillment_job_key(order_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Variant Prices
    // =========================================================================

    fn put_variant_price(&self, price: &VariantPrice) -> Result<()> {
        self.put_value(
            cf::VARIANT_PRICES,
            &keys::variant_price_key(price.variant_id),
            price,
        )
    }

    fn get_variant_price(&self, variant_id: VariantId) -> Result<Option<VariantPrice>> {
        self.get_value(cf::VARIANT_PRICES, &keys::variant_price_key(variant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use storefront_core::{CartItem, CartSnapshot, OrderStatus, ReadableOrderId, ShippingAddress};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn test_address() -> ShippingAddress {
        ShippingAddress {
            name: Some("Test Customer".into()),
            address1: "1 High Street".into(),
            address2: None,
            city: "London".into(),
            state_code: None,
            country_code: "GB".into(),
            zip: "SW1A 1AA".into(),
        }
    }

    fn test_order(payment_intent_id: &str) -> Order {
        let now = chrono::Utc::now();
        Order {
            id: OrderId::generate(),
            payment_intent_id: payment_intent_id.to_string(),
            readable_order_id: ReadableOrderId::generate(),
            customer_email: "customer@example.com".into(),
            items: vec![CartItem::catalog(
                "tshirt-m",
                storefront_core::VariantId::new(4017),
                2,
                dec!(10.00),
            )],
            shipping_address: test_address(),
            subtotal: dec!(20.00),
            shipping_cost: dec!(4.99),
            total_amount: dec!(24.99),
            currency: "GBP".into(),
            status: OrderStatus::Paid,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn webhook_event_insert_is_unique() {
        let (store, _dir) = create_test_store();
        let event = WebhookEvent::received(
            "evt_123",
            "stripe",
            "payment_intent.succeeded",
            serde_json::json!({"id": "evt_123"}),
        );

        store.insert_webhook_event(&event).unwrap();

        let dup = store.insert_webhook_event(&event);
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));

        // Same event ID from a different source is a different delivery.
        let other = WebhookEvent::received("evt_123", "printful", "package_shipped", serde_json::json!({}));
        store.insert_webhook_event(&other).unwrap();
    }

    #[test]
    fn mark_webhook_processed_records_error() {
        let (store, _dir) = create_test_store();
        let event =
            WebhookEvent::received("evt_9", "stripe", "charge.refunded", serde_json::json!({}));
        store.insert_webhook_event(&event).unwrap();

        store
            .mark_webhook_processed("stripe", "evt_9", Some("boom".into()))
            .unwrap();

        let stored = store.get_webhook_event("stripe", "evt_9").unwrap().unwrap();
        assert!(stored.processed);
        assert!(stored.processed_at.is_some());
        assert_eq!(stored.error.as_deref(), Some("boom"));
    }

    #[test]
    fn mark_webhook_processed_missing_row() {
        let (store, _dir) = create_test_store();
        let result = store.mark_webhook_processed("stripe", "evt_missing", None);
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn one_order_per_payment_intent() {
        let (store, _dir) = create_test_store();
        let first = test_order("pi_123");
        store.insert_order(&first).unwrap();

        // A second order for the same intent loses; caller reads the winner.
        let second = test_order("pi_123");
        let result = store.insert_order(&second);
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));

        let winner = store.get_order_by_intent("pi_123").unwrap().unwrap();
        assert_eq!(winner.id, first.id);
        assert_eq!(
            winner.readable_order_id.as_str(),
            first.readable_order_id.as_str()
        );
    }

    #[test]
    fn order_lookup_by_id_and_intent() {
        let (store, _dir) = create_test_store();
        let order = test_order("pi_456");
        store.insert_order(&order).unwrap();

        let by_id = store.get_order(&order.id).unwrap().unwrap();
        assert_eq!(by_id.payment_intent_id, "pi_456");
        assert_eq!(by_id.total_amount, dec!(24.99));

        assert!(store.get_order_by_intent("pi_other").unwrap().is_none());
    }

    #[test]
    fn idempotency_record_is_unique_until_expiry() {
        let (store, _dir) = create_test_store();
        let record = IdempotencyRecord::new("cart_abc123", serde_json::json!({"pi": "pi_1"}));
        store.record_idempotency(&record).unwrap();

        let hit = store.check_idempotency("cart_abc123").unwrap().unwrap();
        assert_eq!(hit.result, serde_json::json!({"pi": "pi_1"}));

        let dup = store.record_idempotency(&record);
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn expired_idempotency_record_reads_as_absent() {
        let (store, _dir) = create_test_store();
        let now = chrono::Utc::now();
        let expired = IdempotencyRecord {
            key: "cart_old".into(),
            result: serde_json::json!({}),
            created_at: now - chrono::Duration::hours(48),
            expires_at: now - chrono::Duration::hours(24),
        };
        store.record_idempotency(&expired).unwrap();

        assert!(store.check_idempotency("cart_old").unwrap().is_none());

        // The expired row no longer protects the key.
        let fresh = IdempotencyRecord::new("cart_old", serde_json::json!({"pi": "pi_2"}));
        store.record_idempotency(&fresh).unwrap();
        let hit = store.check_idempotency("cart_old").unwrap().unwrap();
        assert_eq!(hit.result, serde_json::json!({"pi": "pi_2"}));
    }

    #[test]
    fn checkout_session_roundtrip() {
        let (store, _dir) = create_test_store();
        let cart = CartSnapshot::new(
            "customer@example.com",
            vec![CartItem::catalog(
                "mug",
                storefront_core::VariantId::new(88),
                1,
                dec!(12.50),
            )],
            test_address(),
        );
        let session = CheckoutSession {
            payment_intent_id: "pi_789".into(),
            cart,
            subtotal: dec!(12.50),
            shipping_cost: dec!(4.99),
            total: dec!(17.49),
            currency: "gbp".into(),
            created_at: chrono::Utc::now(),
        };

        store.put_checkout_session(&session).unwrap();

        let loaded = store.get_checkout_session("pi_789").unwrap().unwrap();
        assert_eq!(loaded.total, dec!(17.49));
        assert_eq!(loaded.cart.customer_email, "customer@example.com");
    }

    #[test]
    fn one_fulfillment_per_order() {
        let (store, _dir) = create_test_store();
        let order_id = OrderId::generate();

        let fulfillment = Fulfillment::submitted(order_id, "pf_1001");
        store.insert_fulfillment(&fulfillment).unwrap();

        let dup = store.insert_fulfillment(&Fulfillment::submitted(order_id, "pf_1002"));
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));

        let stored = store.get_fulfillment(&order_id).unwrap().unwrap();
        assert_eq!(stored.provider_order_id, "pf_1001");
    }

    #[test]
    fn fulfillment_status_update_by_provider_order() {
        let (store, _dir) = create_test_store();
        let order_id = OrderId::generate();
        store
            .insert_fulfillment(&Fulfillment::submitted(order_id, "pf_2001"))
            .unwrap();

        let tracking = TrackingInfo {
            tracking_number: Some("TRK123".into()),
            tracking_url: Some("https://carrier.example/TRK123".into()),
            shipped_at: Some(chrono::Utc::now()),
        };
        let updated = store
            .update_fulfillment_status("pf_2001", FulfillmentStatus::Shipped, Some(tracking))
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, FulfillmentStatus::Shipped);
        assert_eq!(
            updated.tracking.as_ref().unwrap().tracking_number.as_deref(),
            Some("TRK123")
        );

        // Unknown provider orders are reported, not errored.
        let missing = store
            .update_fulfillment_status("pf_nope", FulfillmentStatus::Shipped, None)
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn status_update_without_tracking_keeps_existing() {
        let (store, _dir) = create_test_store();
        let order_id = OrderId::generate();
        store
            .insert_fulfillment(&Fulfillment::submitted(order_id, "pf_3001"))
            .unwrap();

        let tracking = TrackingInfo {
            tracking_number: Some("TRK9".into()),
            tracking_url: None,
            shipped_at: None,
        };
        store
            .update_fulfillment_status("pf_3001", FulfillmentStatus::Shipped, Some(tracking))
            .unwrap();

        let updated = store
            .update_fulfillment_status("pf_3001", FulfillmentStatus::Delivered, None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, FulfillmentStatus::Delivered);
        assert_eq!(
            updated.tracking.unwrap().tracking_number.as_deref(),
            Some("TRK9")
        );
    }

    #[test]
    fn fulfillment_job_queue_lifecycle() {
        let (store, _dir) = create_test_store();
        let a = FulfillmentJob::new(OrderId::generate());
        let b = FulfillmentJob::new(OrderId::generate());

        store.enqueue_fulfillment_job(&a).unwrap();
        store.enqueue_fulfillment_job(&b).unwrap();

        let pending = store.list_pending_fulfillment_jobs().unwrap();
        assert_eq!(pending.len(), 2);

        store.complete_fulfillment_job(&a.order_id).unwrap();
        let pending = store.list_pending_fulfillment_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, b.order_id);

        // Completing an absent job is a no-op.
        store.complete_fulfillment_job(&a.order_id).unwrap();
    }

    #[test]
    fn reenqueue_bumps_attempts_in_place() {
        let (store, _dir) = create_test_store();
        let mut job = FulfillmentJob::new(OrderId::generate());
        store.enqueue_fulfillment_job(&job).unwrap();

        job.attempts += 1;
        store.enqueue_fulfillment_job(&job).unwrap();

        let pending = store.list_pending_fulfillment_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
    }

    #[test]
    fn variant_price_roundtrip() {
        let (store, _dir) = create_test_store();
        let price = VariantPrice::new(VariantId::new(4017), dec!(24.99), "GBP");
        store.put_variant_price(&price).unwrap();

        let loaded = store.get_variant_price(VariantId::new(4017)).unwrap().unwrap();
        assert_eq!(loaded.price, dec!(24.99));
        assert!(store.get_variant_price(VariantId::new(9999)).unwrap().is_none());
    }
}
