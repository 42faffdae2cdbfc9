//! Error types for the payment middleware client.

use axum::http::StatusCode;
use thiserror::Error;

/// The stage of a middleware exchange that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Serialize,
    Connect,
    Read,
    Status,
    Decode,
}

impl Stage {
    /// Stage name used in logs and client-facing messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serialize => "serialize",
            Self::Connect => "connect",
            Self::Read => "read",
            Self::Status => "status",
            Self::Decode => "decode",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when talking to the payment middleware.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The payment request could not be encoded.
    #[error("could not serialize payment request: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The middleware could not be reached (includes timeouts).
    #[error("could not reach payment middleware: {0}")]
    Connect(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("could not read payment middleware response: {0}")]
    Read(#[source] reqwest::Error),

    /// The middleware answered with a non-success status.
    #[error("payment middleware returned {status}")]
    Status {
        /// Status the middleware returned.
        status: StatusCode,
        /// Raw response body, for server-side logs only.
        body: String,
    },

    /// The response body was not a transaction.
    #[error("could not decode transaction data: {0}")]
    Decode(#[source] serde_json::Error),
}

impl MiddlewareError {
    /// The stage this error came from.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Client(_) | Self::Connect(_) => Stage::Connect,
            Self::Serialize(_) => Stage::Serialize,
            Self::Read(_) => Stage::Read,
            Self::Status { .. } => Stage::Status,
            Self::Decode(_) => Stage::Decode,
        }
    }

    /// Status code to report to the caller.
    ///
    /// The middleware's own status when it returned one, otherwise 500.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message. Never includes the middleware's response body.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self.stage() {
            Stage::Serialize => "payment request could not be prepared",
            Stage::Connect => "payment middleware unavailable",
            Stage::Read => "payment middleware response could not be read",
            Stage::Status => "payment middleware rejected the request",
            Stage::Decode => "payment middleware response was not understood",
        }
    }
}
