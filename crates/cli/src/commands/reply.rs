//! Manual mention reply.
//!
//! Runs the same responder the relay uses for the mention stream, once.
//! Without `--live` the reply is only logged and no credentials are needed.
//!
//! # Environment Variables
//!
//! - `DONATE_LINK` - Link included in the reply
//! - `TWITTER_API_BASE`, `TWITTER_BEARER_TOKEN`, `TWITTER_USER_TOKEN` - required with `--live`

use std::sync::Arc;

use async_trait::async_trait;
use charity_yeti_core::{PostId, SocialUser, SocialUserId};
use charity_yeti_relay::config::{ConfigError, ResponderConfig, TwitterConfig};
use charity_yeti_relay::responder::{MentionResponder, ReplyOutcome, ResponderError};
use charity_yeti_relay::social::{SocialClient, SocialError, TwitterClient};
use thiserror::Error;

/// Errors that can occur while replying.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `--live` was given without Twitter credentials.
    #[error("Live replies need TWITTER_BEARER_TOKEN and TWITTER_USER_TOKEN")]
    MissingCredentials,

    /// The Twitter client could not be created.
    #[error("Twitter client error: {0}")]
    Social(#[from] SocialError),

    /// The reply could not be produced or posted.
    #[error("Reply failed: {0}")]
    Responder(#[from] ResponderError),
}

/// Stand-in client for dry runs; every call fails.
struct OfflineClient;

#[async_trait]
impl SocialClient for OfflineClient {
    async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError> {
        Err(SocialError::Api(format!("offline: cannot look up user {id}")))
    }

    async fn post_status(
        &self,
        _text: &str,
        _in_reply_to: Option<PostId>,
    ) -> Result<PostId, SocialError> {
        Err(SocialError::Api("offline: cannot post".to_string()))
    }
}

/// Reply to a single mention.
///
/// # Errors
///
/// Returns an error if configuration is invalid, credentials are missing for
/// a live reply, the honorary is empty, or posting fails.
pub async fn run(
    username: &str,
    honorary: &str,
    post_id: PostId,
    live: bool,
) -> Result<ReplyOutcome, ReplyError> {
    dotenvy::dotenv().ok();

    let config = ResponderConfig {
        send_responses: live,
        ..ResponderConfig::from_env()?
    };

    let client: Arc<dyn SocialClient> = if live {
        let twitter = TwitterConfig::from_env()?.ok_or(ReplyError::MissingCredentials)?;
        Arc::new(TwitterClient::new(&twitter)?)
    } else {
        Arc::new(OfflineClient)
    };

    let outcome = MentionResponder::new(client, config)
        .respond(username, honorary, post_id)
        .await?;

    match outcome.posted {
        Some(id) => tracing::info!("Reply posted as {}: {}", id, outcome.text),
        None => tracing::info!("Dry run, not posted: {}", outcome.text),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_needs_no_credentials() {
        let outcome = MentionResponder::new(Arc::new(OfflineClient), ResponderConfig::default())
            .respond("alice", "bob", PostId::new(42))
            .await
            .expect("dry run succeeds");

        assert!(outcome.text.starts_with("Hi @alice!"));
        assert!(outcome.posted.is_none());
    }

    #[tokio::test]
    async fn test_offline_client_refuses_to_post() {
        let result = OfflineClient.post_status("hello", None).await;
        assert!(matches!(result, Err(SocialError::Api(_))));
    }
}
