//! Printful API client implementation.

use reqwest::Client;
use std::time::Duration;

use super::types::{
    Envelope, OrderRequest, PrintfulErrorResponse, ProviderOrder, ProviderRate, RateItem,
    RateRecipient, RateRequest,
};

/// Error type for Printful operations.
#[derive(Debug, thiserror::Error)]
pub enum PrintfulError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Printful API returned an error.
    #[error("Printful API error ({code}): {message}")]
    Api {
        /// Status code echoed in the body.
        code: i64,
        /// Error message.
        message: String,
    },
}

/// Printful API client.
#[derive(Debug, Clone)]
pub struct PrintfulClient {
    client: Client,
    base_url: String,
    token: String,
    store_id: Option<String>,
}

impl PrintfulClient {
    /// Printful API base URL.
    const BASE_URL: &'static str = "https://api.printful.com";

    /// Create a new Printful client.
    ///
    /// # Arguments
    ///
    /// * `token` - Printful API token
    /// * `store_id` - Store ID for multi-store tokens, sent as `X-PF-Store-Id`
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(token: impl Into<String>, store_id: Option<String>) -> Self {
        Self::with_base_url(Self::BASE_URL, token, store_id)
    }

    /// Create a client against a custom base URL (used in tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        store_id: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            store_id,
        }
    }

    /// Quote shipping rates for a destination and item set.
    pub async fn shipping_rates(
        &self,
        recipient: RateRecipient,
        items: Vec<RateItem>,
    ) -> Result<Vec<ProviderRate>, PrintfulError> {
        let url = format!("{}/shipping/rates", self.base_url);
        let request = RateRequest { recipient, items };

        let response = self
            .request(self.client.post(&url))
            .json(&request)
            .send()
            .await?;

        self.handle_response::<Vec<ProviderRate>>(response).await
    }

    /// Create (and confirm) a fulfillment order.
    ///
    /// The `idempotency_key` is derived solely from our order ID, so retrying
    /// a submission replays the original provider order instead of creating a
    /// second shipment.
    pub async fn create_order(
        &self,
        order: &OrderRequest,
        idempotency_key: &str,
    ) -> Result<ProviderOrder, PrintfulError> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .request(self.client.post(&url))
            .query(&[("confirm", "true")])
            .header("Idempotency-Key", idempotency_key)
            .json(order)
            .send()
            .await?;

        self.handle_response::<ProviderOrder>(response).await
    }

    /// Attach auth headers common to all requests.
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&self.token);
        match &self.store_id {
            Some(store_id) => builder.header("X-PF-Store-Id", store_id),
            None => builder,
        }
    }

    /// Unwrap the `{code, result}` envelope and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PrintfulError> {
        let status = response.status();

        if status.is_success() {
            let envelope: Envelope<T> = response.json().await?;
            return Ok(envelope.result);
        }

        let error_body: Result<PrintfulErrorResponse, _> = response.json().await;

        match error_body {
            Ok(err) => Err(PrintfulError::Api {
                code: err.code,
                message: err.error.message,
            }),
            Err(_) => Err(PrintfulError::Api {
                code: i64::from(status.as_u16()),
                message: format!("HTTP {status}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_strips_trailing_slash() {
        let client = PrintfulClient::with_base_url("http://localhost:9000/", "token", None);
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn client_carries_store_id() {
        let client = PrintfulClient::new("token", Some("1234".into()));
        assert_eq!(client.store_id.as_deref(), Some("1234"));
    }
}
