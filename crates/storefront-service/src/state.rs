//! Application state.

use std::sync::Arc;

use storefront_store::RocksStore;

use crate::cache::{MemoryQuoteCache, QuoteCache};
use crate::config::ServiceConfig;
use crate::fulfillment::FulfillmentDispatcher;
use crate::printful::PrintfulClient;
use crate::shipping::RateGateway;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for payment intents (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Printful client for rates and fulfillment (optional).
    pub printful: Option<Arc<PrintfulClient>>,

    /// Shipping rate gateway.
    pub shipping: Arc<RateGateway>,

    /// Fulfillment dispatcher handle.
    pub dispatcher: FulfillmentDispatcher,
}

impl AppState {
    /// Create application state with the default in-memory quote cache.
    ///
    /// Spawns the fulfillment dispatcher worker, so this must run inside a
    /// Tokio runtime.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        Self::with_cache(store, config, Arc::new(MemoryQuoteCache::new()))
    }

    /// Create application state with an injected quote cache.
    #[must_use]
    pub fn with_cache(
        store: Arc<RocksStore>,
        config: ServiceConfig,
        quote_cache: Arc<dyn QuoteCache>,
    ) -> Self {
        let stripe = config.stripe_secret_key.as_ref().map(|key| {
            tracing::info!("Stripe integration enabled");
            let client = match &config.stripe_api_base {
                Some(base) => {
                    StripeClient::with_base_url(base, key, config.stripe_webhook_secret.clone())
                }
                None => StripeClient::new(key, config.stripe_webhook_secret.clone()),
            };
            Arc::new(client)
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - checkout will not be available");
        }

        let printful = config.printful_token.as_ref().map(|token| {
            tracing::info!("Printful integration enabled");
            let client = match &config.printful_api_base {
                Some(base) => {
                    PrintfulClient::with_base_url(base, token, config.printful_store_id.clone())
                }
                None => PrintfulClient::new(token, config.printful_store_id.clone()),
            };
            Arc::new(client)
        });

        if printful.is_none() {
            tracing::warn!(
                "Printful not configured - fallback shipping rate only, no fulfillment"
            );
        }

        let shipping = Arc::new(RateGateway::new(
            quote_cache,
            printful.clone(),
            config.fallback_shipping_rate,
            config.currency.clone(),
        ));

        let dispatcher = FulfillmentDispatcher::start(Arc::clone(&store), printful.clone());

        Self {
            store,
            config,
            stripe,
            printful,
            shipping,
            dispatcher,
        }
    }

    /// Check if Stripe is configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.stripe.is_some()
    }
}
