//! Social platform integration.
//!
//! This module provides:
//! - [`SocialClient`], the seam the responder and listener talk through
//! - [`TwitterClient`], the Twitter API v2 implementation
//! - [`lookup_user`], a profile lookup that never fails
//!
//! Profiles are fetched fresh on every lookup and never cached.

mod error;
mod twitter;
mod types;

use async_trait::async_trait;
use charity_yeti_core::{PostId, SocialUser, SocialUserId};
use tracing::{instrument, warn};

pub use error::SocialError;
pub use twitter::{MentionStream, TwitterClient};

/// Operations the relay needs from a social platform.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Fetch a user's profile by numeric id.
    async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError>;

    /// Publish a status, optionally as a reply to an existing post.
    ///
    /// Returns the id of the new post.
    async fn post_status(
        &self,
        text: &str,
        in_reply_to: Option<PostId>,
    ) -> Result<PostId, SocialError>;
}

/// Look up a user's profile.
///
/// The zero id returns `None` without touching the network. Lookup failures
/// are logged and also return `None`.
#[instrument(skip(client))]
pub async fn lookup_user(client: &dyn SocialClient, id: SocialUserId) -> Option<SocialUser> {
    if id.is_unset() {
        return None;
    }

    match client.fetch_user_by_id(id).await {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "Could not look up user");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingClient {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingClient {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl SocialClient for CountingClient {
        async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SocialError::Api("user suspended".to_string()));
            }
            Ok(SocialUser {
                id,
                name: "Hank Green".to_string(),
                email: None,
                screen_name: "hankgreen".to_string(),
            })
        }

        async fn post_status(
            &self,
            _text: &str,
            _in_reply_to: Option<PostId>,
        ) -> Result<PostId, SocialError> {
            Ok(PostId::new(1))
        }
    }

    #[tokio::test]
    async fn test_zero_id_skips_network() {
        let client = CountingClient::new(false);
        let user = lookup_user(&client, SocialUserId::default()).await;

        assert!(user.is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_lookup() {
        let client = CountingClient::new(false);
        let user = lookup_user(&client, SocialUserId::new(42)).await;

        assert_eq!(user.map(|u| u.screen_name), Some("hankgreen".to_string()));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_returns_none() {
        let client = CountingClient::new(true);
        let user = lookup_user(&client, SocialUserId::new(42)).await;

        assert!(user.is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }
}
