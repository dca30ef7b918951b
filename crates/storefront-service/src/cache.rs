//! Shipping quote cache.
//!
//! The cache is injectable so the single-process in-memory implementation can
//! be swapped for a shared backend without touching the rate gateway. The
//! in-memory implementation is per-instance state: two service replicas will
//! each warm their own cache, which costs extra provider calls but nothing
//! else.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::shipping::ShippingQuote;

/// A TTL cache for shipping quotes.
///
/// Writes carry their own TTL; expired entries read as absent.
pub trait QuoteCache: Send + Sync {
    /// Look up a quote. Expired entries return `None`.
    fn get(&self, key: &str) -> Option<ShippingQuote>;

    /// Store a quote under a key with a time-to-live.
    fn set(&self, key: &str, quote: ShippingQuote, ttl: Duration);

    /// Remove a single entry.
    fn delete(&self, key: &str);

    /// Remove all entries.
    fn clear(&self);
}

struct Entry {
    quote: ShippingQuote,
    expires_at: Instant,
}

/// In-memory quote cache with lazy expiry.
///
/// There is no background sweep; stale entries are dropped when read.
#[derive(Default)]
pub struct MemoryQuoteCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryQuoteCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuoteCache for MemoryQuoteCache {
    fn get(&self, key: &str) -> Option<ShippingQuote> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.quote.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, quote: ShippingQuote, ttl: Duration) {
        let entry = Entry {
            quote,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
