//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! POST /payment         - Authorize a donation and record it
//! GET  /health          - Payment middleware health, passed through
//! GET  /health/ready    - Donation store readiness
//! ```

pub mod health;
pub mod payment;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create all routes for the relay.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment", post(payment::authorize_payment))
        .route("/health", get(health::middleware_health))
        .route("/health/ready", get(health::readiness))
}

/// Build the relay application with tracing and request IDs.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Arc;

    use url::Url;

    use crate::config::MiddlewareConfig;
    use crate::payments::MiddlewareClient;
    use crate::state::AppState;
    use crate::store::InMemoryDonationStore;

    use super::*;

    /// State whose middleware points at a closed port.
    pub(crate) fn offline_state(store: InMemoryDonationStore) -> AppState {
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let middleware = MiddlewareClient::new(&MiddlewareConfig {
            authorize_url: base.join("payment").unwrap(),
            health_url: base.join("health").unwrap(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();
        AppState::new(middleware, Arc::new(store), "hankgreen")
    }
}
