//! Mention responder.
//!
//! When someone mentions the bot in reply to another user, the responder
//! answers with a donation link made out on behalf of that user (the
//! "honorary"). Replies are only published when live sending is enabled;
//! otherwise the text is logged and nothing is posted.

mod listener;

use std::sync::Arc;

use charity_yeti_core::{Mention, PostId};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::ResponderConfig;
use crate::social::{SocialClient, SocialError, lookup_user};

pub use listener::{ReconnectBackoff, listen_for_mentions, run_mention_listener};

/// Errors returned by [`MentionResponder::respond`].
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The mention did not reply to anyone, so there is nobody to honor.
    #[error("no honorary to respond on behalf of")]
    NoHonorary,

    /// Publishing the reply failed.
    #[error(transparent)]
    Post(#[from] SocialError),
}

/// What a call to [`MentionResponder::respond`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    /// The reply text, whether or not it was posted.
    pub text: String,
    /// Id of the published reply; `None` when live sending is disabled.
    pub posted: Option<PostId>,
}

/// Builds and publishes donation replies.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct MentionResponder {
    client: Arc<dyn SocialClient>,
    config: ResponderConfig,
}

impl std::fmt::Debug for MentionResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionResponder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MentionResponder {
    #[must_use]
    pub fn new(client: Arc<dyn SocialClient>, config: ResponderConfig) -> Self {
        Self { client, config }
    }

    /// Whether replies are actually published.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.config.send_responses
    }

    /// Reply to `username` with a donation link on behalf of `honorary`.
    ///
    /// # Errors
    ///
    /// Returns `ResponderError::NoHonorary` without making any call when
    /// `honorary` is empty, and `ResponderError::Post` when publishing fails.
    #[instrument(skip(self), fields(live = self.config.send_responses))]
    pub async fn respond(
        &self,
        username: &str,
        honorary: &str,
        post_id: PostId,
    ) -> Result<ReplyOutcome, ResponderError> {
        if honorary.is_empty() {
            return Err(ResponderError::NoHonorary);
        }

        let text = format!(
            "Hi @{username}! You can donate to PiH on @{honorary}'s behalf here: {}",
            self.config.donate_link
        );
        info!(text = %text, "Responding to mention");

        if !self.config.send_responses {
            return Ok(ReplyOutcome { text, posted: None });
        }

        let posted = self.client.post_status(&text, Some(post_id)).await?;
        debug!(reply_id = %posted, "Reply posted");

        Ok(ReplyOutcome {
            text,
            posted: Some(posted),
        })
    }

    /// Reply to a single mention from the stream.
    ///
    /// The honorary is the screen name the mention replied to. When the
    /// platform only supplied the user id, the profile is looked up. Errors
    /// are logged, never returned.
    #[instrument(skip(self, mention), fields(post_id = %mention.post_id, author = %mention.author_screen_name))]
    pub async fn handle_mention(&self, mention: Mention) {
        let honorary = match mention.in_reply_to_screen_name {
            Some(name) => name,
            None => lookup_user(self.client.as_ref(), mention.in_reply_to_user)
                .await
                .map(|user| user.screen_name)
                .unwrap_or_default(),
        };

        match self
            .respond(&mention.author_screen_name, &honorary, mention.post_id)
            .await
        {
            Ok(_) => {}
            Err(ResponderError::NoHonorary) => {
                info!("Mention is not a reply; nothing to do");
            }
            Err(e) => {
                error!(error = %e, "Could not respond to mention");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use charity_yeti_core::{SocialUser, SocialUserId};

    use super::*;

    /// Social client that records every call.
    #[derive(Default)]
    pub(crate) struct RecordingClient {
        pub users: HashMap<SocialUserId, String>,
        pub posts: Mutex<Vec<(String, Option<PostId>)>>,
        pub lookups: AtomicUsize,
        pub fail_posts: bool,
    }

    impl RecordingClient {
        pub(crate) fn posted(&self) -> Vec<(String, Option<PostId>)> {
            self.posts.lock().map(|p| p.clone()).unwrap_or_default()
        }

        pub(crate) fn calls(&self) -> usize {
            self.lookups.load(Ordering::SeqCst) + self.posted().len()
        }
    }

    #[async_trait]
    impl SocialClient for RecordingClient {
        async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.users
                .get(&id)
                .map(|screen_name| SocialUser {
                    id,
                    name: screen_name.clone(),
                    email: None,
                    screen_name: screen_name.clone(),
                })
                .ok_or_else(|| SocialError::Api(format!("user {id} not found")))
        }

        async fn post_status(
            &self,
            text: &str,
            in_reply_to: Option<PostId>,
        ) -> Result<PostId, SocialError> {
            if self.fail_posts {
                return Err(SocialError::Api("duplicate content".to_string()));
            }
            let mut posts = self
                .posts
                .lock()
                .map_err(|_| SocialError::Api("poisoned".to_string()))?;
            posts.push((text.to_string(), in_reply_to));
            Ok(PostId::new(9000 + u64::try_from(posts.len()).unwrap_or_default()))
        }
    }

    pub(crate) fn responder(client: Arc<RecordingClient>, live: bool) -> MentionResponder {
        MentionResponder::new(
            client,
            ResponderConfig {
                send_responses: live,
                ..ResponderConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_dry_run_formats_without_posting() {
        let client = Arc::new(RecordingClient::default());
        let outcome = responder(client.clone(), false)
            .respond("alice", "bob", PostId::new(42))
            .await
            .unwrap();

        assert!(outcome.text.contains("Hi @alice"));
        assert!(outcome.text.contains("@bob"));
        assert!(outcome.text.ends_with(crate::config::DEFAULT_DONATE_LINK));
        assert!(outcome.posted.is_none());
        assert_eq!(client.calls(), 0);
    }

    /// Shared buffer the fmt subscriber writes into.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_dry_run_logs_reply_text() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Arc::new(RecordingClient::default());
        responder(client.clone(), false)
            .respond("alice", "bob", PostId::new(42))
            .await
            .unwrap();

        let output = logs.contents();
        assert!(output.contains("Responding to mention"), "{output}");
        assert!(output.contains("Hi @alice"), "{output}");
        assert!(output.contains("@bob's behalf"), "{output}");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_honorary_makes_no_calls() {
        let client = Arc::new(RecordingClient::default());
        let result = responder(client.clone(), true)
            .respond("alice", "", PostId::new(42))
            .await;

        assert!(matches!(result, Err(ResponderError::NoHonorary)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_live_reply_is_posted_to_the_mention() {
        let client = Arc::new(RecordingClient::default());
        let outcome = responder(client.clone(), true)
            .respond("alice", "bob", PostId::new(42))
            .await
            .unwrap();

        assert_eq!(outcome.posted, Some(PostId::new(9001)));
        assert_eq!(
            client.posted(),
            vec![(
                "Hi @alice! You can donate to PiH on @bob's behalf here: \
                 https://donate.pih.org/page/contribute/maternal-health-sierra-leone"
                    .to_string(),
                Some(PostId::new(42))
            )]
        );
    }

    #[tokio::test]
    async fn test_post_failure_is_returned() {
        let client = Arc::new(RecordingClient {
            fail_posts: true,
            ..RecordingClient::default()
        });
        let result = responder(client, true)
            .respond("alice", "bob", PostId::new(42))
            .await;

        assert!(matches!(
            result,
            Err(ResponderError::Post(SocialError::Api(_)))
        ));
    }

    #[tokio::test]
    async fn test_handle_mention_resolves_honorary_by_id() {
        let client = Arc::new(RecordingClient {
            users: HashMap::from([(SocialUserId::new(22), "bob".to_string())]),
            ..RecordingClient::default()
        });

        responder(client.clone(), true)
            .handle_mention(Mention {
                post_id: PostId::new(7),
                author_screen_name: "alice".to_string(),
                in_reply_to_screen_name: None,
                in_reply_to_user: SocialUserId::new(22),
                text: "@charityyeti".to_string(),
            })
            .await;

        let posts = client.posted();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].0.contains("on @bob's behalf"));
        assert_eq!(posts[0].1, Some(PostId::new(7)));
    }

    #[tokio::test]
    async fn test_handle_mention_without_reply_target_is_ignored() {
        let client = Arc::new(RecordingClient::default());

        responder(client.clone(), true)
            .handle_mention(Mention {
                post_id: PostId::new(7),
                author_screen_name: "alice".to_string(),
                in_reply_to_screen_name: None,
                in_reply_to_user: SocialUserId::default(),
                text: "@charityyeti".to_string(),
            })
            .await;

        assert_eq!(client.calls(), 0);
    }
}
