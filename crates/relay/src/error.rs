//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side faults are
//! captured to Sentry before the response is built; clients only ever see
//! a short generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use charity_yeti_core::{DonorDocumentId, ValidationError};
use thiserror::Error;

use crate::payments::MiddlewareError;
use crate::store::StoreError;

/// Body returned for every malformed or invalid request.
pub const BAD_REQUEST_MESSAGE: &str = "bad request";

/// Body returned when a charge succeeded but the donation was not stored.
pub const NOT_RECORDED_MESSAGE: &str = "payment processed but donation was not recorded";

/// Application-level error type for the relay.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request body could not be decoded.
    #[error("could not decode request: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request decoded but is not acceptable.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The payment middleware failed or rejected the request.
    #[error("payment middleware error at {stage} stage: {0}", stage = .0.stage())]
    Middleware(#[from] MiddlewareError),

    /// The charge went through but the donation could not be stored.
    #[error(
        "donation for transaction {transaction_id} (donor {donor_document_id}, amount {amount}) was not recorded: {source}"
    )]
    DonationNotRecorded {
        transaction_id: String,
        donor_document_id: DonorDocumentId,
        amount: String,
        #[source]
        source: StoreError,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code sent to the client.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Middleware(err) => err.status_code(),
            Self::DonationNotRecorded { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body sent to the client. Never includes upstream error details.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::Validation(_) => BAD_REQUEST_MESSAGE,
            Self::Middleware(err) => err.public_message(),
            Self::DonationNotRecorded { .. } => NOT_RECORDED_MESSAGE,
            Self::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Decode(_) | Self::Validation(_) => {
                tracing::debug!(error = %self, "Rejected request");
            }
            Self::Middleware(err) => {
                tracing::warn!(
                    error = %self,
                    stage = %err.stage(),
                    status = %err.status_code(),
                    "Payment authorization failed"
                );
            }
            Self::DonationNotRecorded { .. } => {
                let event_id = sentry::with_scope(
                    |scope| scope.set_tag("reconciliation", "required"),
                    || sentry::capture_error(&self),
                );
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    reconciliation = "required",
                    "Payment processed but donation was not recorded"
                );
            }
            Self::Internal(_) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Request error"
                );
            }
        }

        (self.status_code(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_decode_error_is_generic_bad_request() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let (status, body) = body_of(AppError::Decode(err)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "bad request");
    }

    #[tokio::test]
    async fn test_validation_error_is_generic_bad_request() {
        let (status, body) = body_of(AppError::Validation(ValidationError::MissingNonce)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "bad request");
    }

    #[tokio::test]
    async fn test_middleware_status_is_forwarded_without_body() {
        let err = AppError::Middleware(MiddlewareError::Status {
            status: StatusCode::PAYMENT_REQUIRED,
            body: "gateway says: card 4111 declined".to_string(),
        });
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert!(!body.contains("4111"));
        assert_eq!(body, "payment middleware rejected the request");
    }

    #[tokio::test]
    async fn test_donation_not_recorded_is_500() {
        let err = AppError::DonationNotRecorded {
            transaction_id: "txn_1".to_string(),
            donor_document_id: DonorDocumentId::new("doc-1"),
            amount: "5.00".to_string(),
            source: StoreError::Unavailable("down".to_string()),
        };
        assert!(err.to_string().contains("txn_1"));

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, NOT_RECORDED_MESSAGE);
    }
}
