//! Payment middleware client.
//!
//! The relay never talks to the payment processor directly. It forwards the
//! tokenized payment data to a middleware service that owns the processor
//! credentials, and turns the middleware's answer into a [`Transaction`].

pub mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use charity_yeti_core::{PaymentAuthorizationRequest, Transaction};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::MiddlewareConfig;

pub use error::{MiddlewareError, Stage};

/// Status and raw body returned by the middleware health endpoint.
#[derive(Debug, Clone)]
pub struct HealthResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Payment middleware client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct MiddlewareClient {
    inner: Arc<MiddlewareClientInner>,
}

struct MiddlewareClientInner {
    client: reqwest::Client,
    authorize_url: Url,
    health_url: Url,
}

impl std::fmt::Debug for MiddlewareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareClient")
            .field("authorize_url", &self.inner.authorize_url.as_str())
            .field("health_url", &self.inner.health_url.as_str())
            .finish_non_exhaustive()
    }
}

impl MiddlewareClient {
    /// Create a new middleware client.
    ///
    /// Every request made by this client is bounded by `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `MiddlewareError::Client` if the HTTP client fails to build.
    pub fn new(config: &MiddlewareConfig) -> Result<Self, MiddlewareError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MiddlewareError::Client)?;

        Ok(Self {
            inner: Arc::new(MiddlewareClientInner {
                client,
                authorize_url: config.authorize_url.clone(),
                health_url: config.health_url.clone(),
            }),
        })
    }

    /// Forward a payment authorization to the middleware.
    ///
    /// The request is sent as a JSON `POST`. The response body is read into
    /// memory once and decoded from that buffer.
    ///
    /// On failure the error reports which stage broke and which status the
    /// caller should see (see [`MiddlewareError::status_code`]).
    ///
    /// # Errors
    ///
    /// Returns a `MiddlewareError` if the request cannot be serialized, the
    /// middleware cannot be reached, the body cannot be read, the middleware
    /// answers with a non-success status, or the body is not a transaction.
    #[instrument(skip(self, request), fields(donor_document_id = %request.donor_document_id))]
    pub async fn send_payment_authorization(
        &self,
        request: &PaymentAuthorizationRequest,
    ) -> Result<Transaction, MiddlewareError> {
        info!("Sending payment authorization to middleware");

        let payload = serde_json::to_vec(request).map_err(|e| {
            error!(error = %e, "Could not serialize payment request");
            MiddlewareError::Serialize(e)
        })?;

        let response = self
            .inner
            .client
            .post(self.inner.authorize_url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "Could not reach payment middleware");
                MiddlewareError::Connect(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!(error = %e, "Could not read middleware response");
            MiddlewareError::Read(e)
        })?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            warn!(status = %status, body = %body, "Middleware rejected payment authorization");
            return Err(MiddlewareError::Status { status, body });
        }

        let transaction: Transaction = serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Could not decode transaction data");
            MiddlewareError::Decode(e)
        })?;

        debug!(transaction_id = %transaction.id, amount = %transaction.amount, "Middleware authorized payment");
        Ok(transaction)
    }

    /// Fetch the middleware's health endpoint.
    ///
    /// The status and body are returned untouched so the caller can mirror
    /// them byte-for-byte.
    ///
    /// # Errors
    ///
    /// Returns `MiddlewareError::Connect` or `MiddlewareError::Read` on local
    /// transport failures. A non-success status is not an error here.
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<HealthResponse, MiddlewareError> {
        info!("Checking middleware health");

        let response = self
            .inner
            .client
            .get(self.inner.health_url.clone())
            .send()
            .await
            .map_err(MiddlewareError::Connect)?;

        let status = response.status();
        let body = response.bytes().await.map_err(MiddlewareError::Read)?;

        debug!(status = %status, body = %String::from_utf8_lossy(&body), "Response from middleware");
        Ok(HealthResponse { status, body })
    }
}
