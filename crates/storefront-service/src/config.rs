//! Service configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/storefront").
    pub data_dir: String,

    /// Stripe secret API key (optional; checkout disabled without it).
    pub stripe_secret_key: Option<String>,

    /// Stripe webhook signing secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL override (for testing against a mock server).
    pub stripe_api_base: Option<String>,

    /// Printful API token (optional; live rates and fulfillment disabled
    /// without it).
    pub printful_token: Option<String>,

    /// Printful store ID, sent as `X-PF-Store-Id` (optional).
    pub printful_store_id: Option<String>,

    /// Printful API base URL override (for testing against a mock server).
    pub printful_api_base: Option<String>,

    /// Flat shipping rate used when the carrier-rate API is unavailable.
    pub fallback_shipping_rate: Decimal,

    /// Currency for shipping quotes and checkout (default: "GBP").
    pub currency: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/storefront".into()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
            stripe_api_base: std::env::var("STRIPE_API_BASE").ok(),
            printful_token: std::env::var("PRINTFUL_TOKEN").ok(),
            printful_store_id: std::env::var("PRINTFUL_STORE_ID").ok(),
            printful_api_base: std::env::var("PRINTFUL_API_BASE").ok(),
            fallback_shipping_rate: std::env::var("FALLBACK_SHIPPING_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(dec!(4.99)),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "GBP".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/storefront".into(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: None,
            printful_token: None,
            printful_store_id: None,
            printful_api_base: None,
            fallback_shipping_rate: dec!(4.99),
            currency: "GBP".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
