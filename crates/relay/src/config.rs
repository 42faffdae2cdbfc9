//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RELAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MIDDLEWARE_AUTHORIZE_URL` - Payment middleware authorization endpoint
//! - `MIDDLEWARE_HEALTH_URL` - Payment middleware health endpoint
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Listen port (default: 8080)
//! - `MIDDLEWARE_TIMEOUT_SECS` - Timeout for every middleware call (default: 10)
//! - `DONATION_HONORARY` - Honorary recorded on every donation (default: empty)
//! - `DONATE_LINK` - Link included in mention replies
//! - `SEND_RESPONSES` - Actually post mention replies (default: false, dry run)
//! - `TWITTER_API_BASE` - Twitter API base URL (default: <https://api.twitter.com>)
//! - `TWITTER_BEARER_TOKEN` - App-only token for the mention stream
//! - `TWITTER_USER_TOKEN` - User-context token for lookups and replies
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default link posted in mention replies.
pub const DEFAULT_DONATE_LINK: &str =
    "https://donate.pih.org/page/contribute/maternal-health-sierra-leone";

const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";
const DEFAULT_MIDDLEWARE_TIMEOUT_SECS: u64 = 10;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Relay application configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Payment middleware endpoints
    pub middleware: MiddlewareConfig,
    /// Honorary recorded on every donation
    pub honorary: String,
    /// Mention responder behaviour
    pub responder: ResponderConfig,
    /// Twitter credentials; `None` disables the mention listener
    pub twitter: Option<TwitterConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Payment middleware endpoints.
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// Endpoint that authorizes a payment
    pub authorize_url: Url,
    /// Endpoint whose status and body are mirrored by `/health`
    pub health_url: Url,
    /// Upper bound on every middleware round trip
    pub timeout: Duration,
}

/// Mention responder configuration.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Link included in every reply
    pub donate_link: String,
    /// Post replies for real; `false` only logs them
    pub send_responses: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            donate_link: DEFAULT_DONATE_LINK.to_string(),
            send_responses: false,
        }
    }
}

/// Twitter API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct TwitterConfig {
    /// API base URL (overridable for testing)
    pub api_base: Url,
    /// App-only bearer token (filtered stream)
    pub bearer_token: SecretString,
    /// User-context access token (lookups and posting)
    pub user_token: SecretString,
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("api_base", &self.api_base.as_str())
            .field("bearer_token", &"[REDACTED]")
            .field("user_token", &"[REDACTED]")
            .finish()
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RELAY_DATABASE_URL")?;
        let host = parse_env("RELAY_HOST", "127.0.0.1")?;
        let port = parse_env("RELAY_PORT", "8080")?;

        let middleware = MiddlewareConfig::from_env()?;
        let honorary = get_env_or_default("DONATION_HONORARY", "");
        let responder = ResponderConfig::from_env()?;
        let twitter = TwitterConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            middleware,
            honorary,
            responder,
            twitter,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MiddlewareConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = parse_env(
            "MIDDLEWARE_TIMEOUT_SECS",
            &DEFAULT_MIDDLEWARE_TIMEOUT_SECS.to_string(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MIDDLEWARE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            authorize_url: get_required_url("MIDDLEWARE_AUTHORIZE_URL")?,
            health_url: get_required_url("MIDDLEWARE_HEALTH_URL")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl ResponderConfig {
    /// Load responder settings on their own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `SEND_RESPONSES` is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            donate_link: get_env_or_default("DONATE_LINK", DEFAULT_DONATE_LINK),
            send_responses: get_bool_env("SEND_RESPONSES", false)?,
        })
    }
}

impl TwitterConfig {
    /// Load Twitter credentials, returning `None` if either token is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a token looks like a placeholder or the base
    /// URL is invalid.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(bearer), Some(user)) = (
            get_optional_env("TWITTER_BEARER_TOKEN"),
            get_optional_env("TWITTER_USER_TOKEN"),
        ) else {
            return Ok(None);
        };

        validate_secret_strength(&bearer, "TWITTER_BEARER_TOKEN")?;
        validate_secret_strength(&user, "TWITTER_USER_TOKEN")?;

        let api_base = get_env_or_default("TWITTER_API_BASE", DEFAULT_TWITTER_API_BASE);
        let api_base = Url::parse(&api_base).map_err(|e| {
            ConfigError::InvalidEnvVar("TWITTER_API_BASE".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            api_base,
            bearer_token: SecretString::from(bearer),
            user_token: SecretString::from(user),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable and parse it as a URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a boolean environment variable.
fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => parse_bool(&value)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), format!("not a boolean: {value}"))),
    }
}

/// Parse the boolean spellings accepted in the environment.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by the developer portal."
            ),
        ));
    }

    Ok(())
}
