//! Social platform errors.

use thiserror::Error;

/// Errors that can occur when talking to the social platform.
#[derive(Debug, Error)]
pub enum SocialError {
    /// HTTP request failed before a response arrived.
    #[error("social request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("social API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Endpoint URL could not be built from the configured base.
    #[error("invalid social API URL: {0}")]
    Url(#[from] url::ParseError),

    /// Failed to parse a response or stream line.
    #[error("social response error: {0}")]
    Response(String),

    /// The platform reported an error in an otherwise successful response.
    #[error("social API error: {0}")]
    Api(String),
}
