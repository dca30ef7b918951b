//! Shipping rate gateway.
//!
//! Sits between checkout and the carrier-rate API: validates the destination
//! before any network call, caches quotes keyed by destination + item set,
//! and degrades to a flat-rate fallback when the provider is unreachable so a
//! rate outage never blocks checkout.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{CartItem, ShippingAddress};

use crate::cache::QuoteCache;
use crate::error::ApiError;
use crate::printful::{PrintfulClient, RateItem};

/// Cache lifetime for quotes from the provider.
pub const PROVIDER_TTL_SECONDS: u64 = 300;

/// Cache lifetime for the synthetic fallback quote. Kept short so a transient
/// provider outage is retried soon instead of pinning the flat rate.
pub const FALLBACK_TTL_SECONDS: u64 = 60;

/// Rate option ID used for the synthetic fallback.
pub const FALLBACK_OPTION_ID: &str = "STANDARD_FALLBACK";

/// One shipping option offered to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingOption {
    /// Rate option ID, e.g. `STANDARD`.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Cost in major units.
    pub rate: Decimal,

    /// ISO currency code.
    pub currency: String,

    /// Earliest delivery estimate in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delivery_days: Option<u32>,

    /// Latest delivery estimate in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delivery_days: Option<u32>,

    /// Carrier name, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// A set of shipping options plus how long the quote may be reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuote {
    /// Available options, as returned by the provider.
    pub options: Vec<ShippingOption>,

    /// Seconds the quote stays valid for.
    pub ttl_seconds: u64,
}

impl ShippingQuote {
    /// The cheapest option, used by checkout as the default shipping cost.
    #[must_use]
    pub fn cheapest(&self) -> Option<&ShippingOption> {
        self.options.iter().min_by_key(|o| o.rate)
    }
}

/// Build the cache key for one destination + item set.
///
/// Items are sorted by variant ID before joining so the same cart in a
/// different order never splits cache entries.
#[must_use]
pub fn cache_key(address: &ShippingAddress, items: &[CartItem]) -> String {
    let mut parts: Vec<String> = items
        .iter()
        .filter(|i| !i.is_discount)
        .filter_map(|i| i.variant_id.map(|v| format!("{v}x{}", i.quantity)))
        .collect();
    parts.sort();

    format!(
        "{}|{}:{}:{}",
        parts.join(","),
        address.country_code.trim().to_uppercase(),
        address.state_code.as_deref().unwrap_or("").trim(),
        address.zip.trim(),
    )
}

/// The shipping rate gateway.
pub struct RateGateway {
    cache: Arc<dyn QuoteCache>,
    printful: Option<Arc<PrintfulClient>>,
    fallback_rate: Decimal,
    currency: String,
}

impl RateGateway {
    /// Create a gateway.
    ///
    /// Without a Printful client every request resolves to the fallback rate.
    #[must_use]
    pub fn new(
        cache: Arc<dyn QuoteCache>,
        printful: Option<Arc<PrintfulClient>>,
        fallback_rate: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            printful,
            fallback_rate,
            currency: currency.into(),
        }
    }

    /// Quote shipping for a destination and item set.
    ///
    /// Validation failures return every problem at once and make no network
    /// call. Provider failures degrade to the flat-rate fallback.
    pub async fn get_shipping_rates(
        &self,
        address: &ShippingAddress,
        items: &[CartItem],
    ) -> Result<ShippingQuote, ApiError> {
        address.validate().map_err(ApiError::Validation)?;

        let rate_items: Vec<RateItem> = items
            .iter()
            .filter(|i| !i.is_discount)
            .filter_map(|i| {
                i.variant_id.map(|v| RateItem {
                    variant_id: v.as_u64(),
                    quantity: i.quantity,
                })
            })
            .collect();

        if rate_items.is_empty() {
            return Err(ApiError::Validation(vec![
                "At least one shippable item is required".to_string(),
            ]));
        }

        let key = cache_key(address, items);
        if let Some(quote) = self.cache.get(&key) {
            tracing::debug!(cache_key = %key, "Shipping quote cache hit");
            return Ok(quote);
        }

        let quote = match &self.printful {
            Some(printful) => match printful.shipping_rates(address.into(), rate_items).await {
                Ok(rates) => {
                    let options: Vec<ShippingOption> = rates
                        .into_iter()
                        .map(|r| ShippingOption {
                            id: r.id,
                            name: r.name,
                            rate: r.rate,
                            currency: r.currency,
                            min_delivery_days: r.min_delivery_days,
                            max_delivery_days: r.max_delivery_days,
                            carrier: None,
                        })
                        .collect();

                    if options.is_empty() {
                        tracing::warn!(cache_key = %key, "Provider returned no rates, using fallback");
                        self.fallback_quote()
                    } else {
                        ShippingQuote {
                            options,
                            ttl_seconds: PROVIDER_TTL_SECONDS,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, cache_key = %key, "Rate API failed, using fallback");
                    self.fallback_quote()
                }
            },
            None => {
                tracing::debug!("Printful not configured, using fallback rate");
                self.fallback_quote()
            }
        };

        self.cache
            .set(&key, quote.clone(), Duration::from_secs(quote.ttl_seconds));

        Ok(quote)
    }

    /// One synthetic flat-rate option.
    fn fallback_quote(&self) -> ShippingQuote {
        ShippingQuote {
            options: vec![ShippingOption {
                id: FALLBACK_OPTION_ID.to_string(),
                name: "Standard Shipping".to_string(),
                rate: self.fallback_rate,
                currency: self.currency.clone(),
                min_delivery_days: Some(3),
                max_delivery_days: Some(10),
                carrier: None,
            }],
            ttl_seconds: FALLBACK_TTL_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryQuoteCache;
    use rust_decimal_macros::dec;
    use storefront_core::VariantId;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: None,
            address1: "1 High Street".into(),
            address2: None,
            city: "London".into(),
            state_code: None,
            country_code: "GB".into(),
            zip: "SW1A 1AA".into(),
        }
    }

    #[test]
    fn cache_key_ignores_item_order() {
        let a = CartItem::catalog("a", VariantId::new(2), 1, dec!(5.00));
        let b = CartItem::catalog("b", VariantId::new(1), 2, dec!(10.00));

        let k1 = cache_key(&address(), &[a.clone(), b.clone()]);
        let k2 = cache_key(&address(), &[b, a]);
        assert_eq!(k1, k2);
    }

    #[test]
    fn cache_key_includes_destination() {
        let item = CartItem::catalog("a", VariantId::new(1), 1, dec!(5.00));
        let mut other = address();
        other.zip = "E1 6AN".into();

        assert_ne!(
            cache_key(&address(), std::slice::from_ref(&item)),
            cache_key(&other, &[item])
        );
    }

    #[test]
    fn cache_key_skips_discount_lines() {
        let item = CartItem::catalog("a", VariantId::new(1), 1, dec!(5.00));
        let with_discount = vec![item.clone(), CartItem::discount("promo", dec!(-1.00))];

        assert_eq!(
            cache_key(&address(), std::slice::from_ref(&item)),
            cache_key(&address(), &with_discount)
        );
    }

    #[tokio::test]
    async fn missing_postal_code_fails_validation() {
        let gateway = RateGateway::new(
            Arc::new(MemoryQuoteCache::new()),
            None,
            dec!(4.99),
            "GBP",
        );
        let mut bad = address();
        bad.zip = " ".into();
        let items = [CartItem::catalog("a", VariantId::new(1), 1, dec!(5.00))];

        let err = gateway.get_shipping_rates(&bad, &items).await.unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains(&"Postal code is required".to_string()));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_yields_fallback() {
        let gateway = RateGateway::new(
            Arc::new(MemoryQuoteCache::new()),
            None,
            dec!(4.99),
            "GBP",
        );
        let items = [CartItem::catalog("a", VariantId::new(1), 1, dec!(5.00))];

        let quote = gateway.get_shipping_rates(&address(), &items).await.unwrap();
        assert_eq!(quote.options.len(), 1);
        assert_eq!(quote.options[0].id, FALLBACK_OPTION_ID);
        assert_eq!(quote.options[0].rate, dec!(4.99));
        assert_eq!(quote.ttl_seconds, FALLBACK_TTL_SECONDS);
    }

    #[tokio::test]
    async fn fallback_quote_expires_before_provider_quotes() {
        let gateway = RateGateway::new(
            Arc::new(MemoryQuoteCache::new()),
            None,
            dec!(4.99),
            "GBP",
        );
        let items = [CartItem::catalog("a", VariantId::new(1), 1, dec!(5.00))];

        let quote = gateway.get_shipping_rates(&address(), &items).await.unwrap();
        assert!(quote.ttl_seconds < PROVIDER_TTL_SECONDS);
    }

    #[test]
    fn cheapest_picks_lowest_rate() {
        let quote = ShippingQuote {
            options: vec![
                ShippingOption {
                    id: "EXPRESS".into(),
                    name: "Express".into(),
                    rate: dec!(9.99),
                    currency: "GBP".into(),
                    min_delivery_days: None,
                    max_delivery_days: None,
                    carrier: None,
                },
                ShippingOption {
                    id: "STANDARD".into(),
                    name: "Standard".into(),
                    rate: dec!(4.99),
                    currency: "GBP".into(),
                    min_delivery_days: None,
                    max_delivery_days: None,
                    carrier: None,
                },
            ],
            ttl_seconds: 180,
        };

        assert_eq!(quote.cheapest().unwrap().id, "STANDARD");
    }
}
