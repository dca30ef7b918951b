//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use super::types::{PaymentIntent, StripeErrorResponse};
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    api_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (`whsec_...`)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(api_key: impl Into<String>, webhook_secret: Option<String>) -> Self {
        Self::with_base_url(Self::BASE_URL, api_key, webhook_secret)
    }

    /// Create a client against a custom base URL (used in tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            webhook_secret,
        }
    }

    /// Create a payment intent.
    ///
    /// The `idempotency_key` is the deterministic cart fingerprint: Stripe
    /// replays the original intent for a repeated key, so retrying the same
    /// logical checkout never opens a second charge.
    ///
    /// # Arguments
    ///
    /// * `amount_minor` - Amount in minor currency units
    /// * `currency` - Lowercase ISO currency code
    /// * `idempotency_key` - Deterministic key for this cart + customer
    /// * `receipt_email` - Customer email for the Stripe receipt
    /// * `metadata` - Size-bounded key/value copy of the checkout
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
        receipt_email: Option<&str>,
        metadata: &[(String, String)],
    ) -> Result<PaymentIntent, StripeError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".into(), amount_minor.to_string()),
            ("currency".into(), currency.to_string()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];

        if let Some(email) = receipt_email {
            params.push(("receipt_email".into(), email.to_string()));
        }

        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(&params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a single payment intent by ID.
    pub async fn get_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/payment_intents/{}",
                self.base_url, payment_intent_id
            ))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Verify a webhook signature.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the `Stripe-Signature` header
    ///   (`t=timestamp,v1=signature,...`)
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            let mut kv = part.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("t"), Some(ts)) => timestamp = Some(ts),
                (Some("v1"), Some(sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;

        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = hmac_sha256_hex(secret, &signed_payload);

        let valid = signatures
            .iter()
            .any(|sig| constant_time_eq(&expected, sig));

        if valid {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_header(secret: &str, payload: &str, timestamp: &str) -> String {
        let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
        format!("t={timestamp},v1={expected}")
    }

    #[test]
    fn verify_accepts_valid_signature() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_test".into()));
        let payload = r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let header = signed_header("whsec_test", payload, "1723456789");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_test".into()));
        let header = signed_header("whsec_test", r#"{"id":"evt_1"}"#, "1723456789");

        let result = client.verify_webhook_signature(r#"{"id":"evt_2"}"#, &header);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn verify_rejects_missing_timestamp() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_test".into()));
        let result = client.verify_webhook_signature("{}", "v1=deadbeef");
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_test".into()));
        let payload = "{}";
        let good = hmac_sha256_hex("whsec_test", &format!("123.{payload}"));
        let header = format!("t=123,v1=bad0000000000000,v1={good}");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn verify_without_secret_is_configuration_error() {
        let client = StripeClient::new("sk_test_xxx", None);
        let result = client.verify_webhook_signature("{}", "t=1,v1=aa");
        assert!(matches!(result, Err(StripeError::Configuration(_))));
    }
}
