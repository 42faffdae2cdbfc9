//! Health endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::state::AppState;

/// Mirror the payment middleware's health endpoint.
///
/// Status code and raw body are passed through untouched. If the middleware
/// cannot be reached at all the relay answers 500 with a generic message;
/// the transport error only goes to the log.
pub async fn middleware_health(State(state): State<AppState>) -> Response {
    match state.middleware().check_health().await {
        Ok(health) => (health.status, health.body).into_response(),
        Err(e) => {
            error!(error = %e, stage = %e.stage(), "Middleware health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.public_message()).into_response()
        }
    }
}

/// Readiness check.
///
/// Returns 503 Service Unavailable if the donation store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!(error = %e, "Donation store not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}
