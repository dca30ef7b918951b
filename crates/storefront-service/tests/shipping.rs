//! Shipping rate endpoint integration tests.

mod common;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rate_request() -> serde_json::Value {
    json!({
        "recipient": {
            "address1": "1 High Street",
            "city": "London",
            "country_code": "GB",
            "zip": "SW1A 1AA"
        },
        "items": [
            { "id": "tshirt-m-black", "variant_id": 4012, "quantity": 2, "price": "19.99" }
        ]
    })
}

fn provider_rates_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 200,
        "result": [
            {
                "id": "STANDARD",
                "name": "Flat Rate (Estimated delivery: 3-7 days)",
                "rate": "3.49",
                "currency": "GBP",
                "minDeliveryDays": 3,
                "maxDeliveryDays": 7
            },
            {
                "id": "EXPRESS",
                "name": "Express",
                "rate": "9.99",
                "currency": "GBP",
                "minDeliveryDays": 1,
                "maxDeliveryDays": 3
            }
        ]
    }))
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn missing_postal_code_is_rejected_before_any_provider_call() {
    let mock_provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shipping/rates"))
        .respond_with(provider_rates_response())
        .expect(0)
        .mount(&mock_provider)
        .await;

    let harness = TestHarness::with_config(|config| {
        config.printful_token = Some("pf-test-token".into());
        config.printful_api_base = Some(mock_provider.uri());
    });

    let mut request = rate_request();
    request["recipient"]["zip"] = json!("");

    let response = harness.server.post("/v1/shipping/rates").json(&request).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "validation_error");
    let errors = body["error"]["details"]["errors"].as_array().unwrap();
    assert!(errors.contains(&json!("Postal code is required")));
}

#[tokio::test]
async fn cart_with_only_discount_items_is_rejected() {
    let harness = TestHarness::new();

    let mut request = rate_request();
    request["items"] = json!([
        { "id": "promo-10-off", "quantity": 1, "price": "-10.00", "is_discount": true }
    ]);

    let response = harness.server.post("/v1/shipping/rates").json(&request).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    let errors = body["error"]["details"]["errors"].as_array().unwrap();
    assert!(errors.contains(&json!("At least one shippable item is required")));
}

// ============================================================================
// Provider rates and caching
// ============================================================================

#[tokio::test]
async fn provider_rates_are_returned_and_cached() {
    let mock_provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shipping/rates"))
        .respond_with(provider_rates_response())
        .expect(1)
        .mount(&mock_provider)
        .await;

    let harness = TestHarness::with_config(|config| {
        config.printful_token = Some("pf-test-token".into());
        config.printful_api_base = Some(mock_provider.uri());
    });

    let response = harness
        .server
        .post("/v1/shipping/rates")
        .json(&rate_request())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let options = body["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["id"], "STANDARD");
    assert_eq!(options[0]["rate"], "3.49");

    // Same cart, same destination: served from cache, no second call.
    let response = harness
        .server
        .post("/v1/shipping/rates")
        .json(&rate_request())
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn cache_key_ignores_item_order() {
    let mock_provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shipping/rates"))
        .respond_with(provider_rates_response())
        .expect(1)
        .mount(&mock_provider)
        .await;

    let harness = TestHarness::with_config(|config| {
        config.printful_token = Some("pf-test-token".into());
        config.printful_api_base = Some(mock_provider.uri());
    });

    let forward = json!({
        "recipient": rate_request()["recipient"],
        "items": [
            { "id": "tshirt", "variant_id": 4012, "quantity": 2, "price": "19.99" },
            { "id": "mug", "variant_id": 7105, "quantity": 1, "price": "9.99" }
        ]
    });
    let reversed = json!({
        "recipient": rate_request()["recipient"],
        "items": [
            { "id": "mug", "variant_id": 7105, "quantity": 1, "price": "9.99" },
            { "id": "tshirt", "variant_id": 4012, "quantity": 2, "price": "19.99" }
        ]
    });

    harness
        .server
        .post("/v1/shipping/rates")
        .json(&forward)
        .await
        .assert_status_ok();
    harness
        .server
        .post("/v1/shipping/rates")
        .json(&reversed)
        .await
        .assert_status_ok();
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn provider_failure_degrades_to_flat_rate() {
    let mock_provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shipping/rates"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_provider)
        .await;

    let harness = TestHarness::with_config(|config| {
        config.printful_token = Some("pf-test-token".into());
        config.printful_api_base = Some(mock_provider.uri());
    });

    let response = harness
        .server
        .post("/v1/shipping/rates")
        .json(&rate_request())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let options = body["options"].as_array().unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0]["id"], "STANDARD_FALLBACK");
    assert_eq!(options[0]["rate"], "4.99");
}

#[tokio::test]
async fn unconfigured_provider_quotes_flat_rate() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/shipping/rates")
        .json(&rate_request())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["options"][0]["id"], "STANDARD_FALLBACK");
}
