//! Integration tests for the health endpoints.

use charity_yeti_integration_tests::TestRelay;
use charity_yeti_relay::store::InMemoryDonationStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_degraded_middleware_is_mirrored_verbatim() {
    let relay = TestRelay::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("degraded"))
        .expect(1)
        .mount(&relay.middleware)
        .await;

    let response = relay.get("/health").await;

    assert_eq!(response.status, 503);
    assert_eq!(response.body, "degraded");
}

#[tokio::test]
async fn test_healthy_middleware_body_is_mirrored() {
    let relay = TestRelay::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":\"ok\",\"braintree\":\"up\"}"))
        .expect(1)
        .mount(&relay.middleware)
        .await;

    let response = relay.get("/health").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "{\"status\":\"ok\",\"braintree\":\"up\"}");
}

#[tokio::test]
async fn test_readiness_follows_the_store() {
    let ready = TestRelay::start().await.get("/health/ready").await;
    assert_eq!(ready.status, 200);

    let unavailable = TestRelay::with_store(InMemoryDonationStore::unavailable("maintenance"))
        .await
        .get("/health/ready")
        .await;
    assert_eq!(unavailable.status, 503);
}
