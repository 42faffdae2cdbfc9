//! Integration tests for Charity Yeti.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p charity-yeti-integration-tests
//! ```
//!
//! No database or network access is needed: the payment middleware and the
//! Twitter API are served by `wiremock`, and donations go to the in-memory
//! store.
//!
//! # Test Categories
//!
//! - `payment_relay` - `POST /payment` end to end
//! - `health` - health pass-through and readiness
//! - `mention_stream` - filtered stream to posted replies

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use charity_yeti_relay::config::{MiddlewareConfig, TwitterConfig};
use charity_yeti_relay::payments::MiddlewareClient;
use charity_yeti_relay::routes;
use charity_yeti_relay::state::AppState;
use charity_yeti_relay::store::InMemoryDonationStore;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::MockServer;

/// Donor document registered in every test store.
pub const DONOR: &str = "donor-doc-1";

/// Honorary configured on the test relay.
pub const HONORARY: &str = "hankgreen";

/// A relay wired to a mock payment middleware and an in-memory store.
pub struct TestRelay {
    pub middleware: MockServer,
    pub store: InMemoryDonationStore,
    app: Router,
}

/// Response captured from the relay.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestRelay {
    /// Start a relay whose store knows [`DONOR`].
    pub async fn start() -> Self {
        Self::with_store(InMemoryDonationStore::new().with_donor(DONOR)).await
    }

    /// Start a relay over the given store.
    pub async fn with_store(store: InMemoryDonationStore) -> Self {
        Self::build(store, Duration::from_secs(5)).await
    }

    /// Start a relay whose middleware calls give up after `timeout`.
    pub async fn with_timeout(timeout: Duration) -> Self {
        Self::build(InMemoryDonationStore::new().with_donor(DONOR), timeout).await
    }

    async fn build(store: InMemoryDonationStore, timeout: Duration) -> Self {
        let middleware = MockServer::start().await;
        let client = middleware_client(&middleware.uri(), timeout);
        let state = AppState::new(client, Arc::new(store.clone()), HONORARY);

        Self {
            middleware,
            store,
            app: routes::app(state),
        }
    }

    /// Send a request through the full router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// `POST /payment` with a raw body.
    pub async fn post_payment(&self, body: impl Into<Body>) -> TestResponse {
        self.send(
            Request::post("/payment")
                .header("content-type", "application/json")
                .body(body.into())
                .expect("valid request"),
        )
        .await
    }

    /// `GET` a path.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::get(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }
}

/// Middleware client pointed at `base`.
pub fn middleware_client(base: &str, timeout: Duration) -> MiddlewareClient {
    let base = Url::parse(base).expect("valid base URL");
    MiddlewareClient::new(&MiddlewareConfig {
        authorize_url: base.join("/payment").expect("valid path"),
        health_url: base.join("/health").expect("valid path"),
        timeout,
    })
    .expect("client builds")
}

/// Twitter configuration pointed at a mock server.
pub fn twitter_config(server: &MockServer) -> TwitterConfig {
    TwitterConfig {
        api_base: Url::parse(&server.uri()).expect("valid base URL"),
        bearer_token: SecretString::from("stream-bearer-token"),
        user_token: SecretString::from("user-context-token"),
    }
}

/// A complete payment request for [`DONOR`].
pub fn payment_request() -> Value {
    json!({
        "donorDocumentId": DONOR,
        "originalTweetId": "1500",
        "invokerTweetId": "1501",
        "inReplyToUser": 22,
        "paymentMethodNonce": "fake-valid-nonce",
        "amount": "10.00",
        "deviceData": "{\"device_session_id\":\"abc\"}",
        "options": [
            {"submitForSettlement": true},
            {"storeInVaultOnSuccess": false}
        ]
    })
}

/// Transaction returned by a successful authorization.
pub fn transaction(id: &str, amount: &str) -> Value {
    json!({
        "amount": amount,
        "billingDetails": {
            "firstName": "Ada",
            "lastName": "Lovelace",
            "postalCode": "00232",
            "countryName": "Sierra Leone"
        },
        "id": id
    })
}
