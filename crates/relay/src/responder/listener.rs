//! Long-running consumer of the mention stream.

use std::future::Future;
use std::time::Duration;

use charity_yeti_core::Mention;
use futures::{Stream, StreamExt};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::MentionResponder;
use crate::social::SocialError;

/// Consume mentions until the stream ends.
///
/// Mentions are taken off the stream in delivery order and each reply runs
/// on its own task, so a slow or failing reply never holds up the next
/// mention. Errors are logged and the loop keeps going. Outstanding replies
/// are awaited before returning.
pub async fn run_mention_listener<S>(responder: MentionResponder, stream: S)
where
    S: Stream<Item = Result<Mention, SocialError>> + Send,
{
    let mut stream = std::pin::pin!(stream);
    let mut replies = JoinSet::new();

    info!(live = responder.is_live(), "Mention listener started");

    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(Ok(mention)) => {
                    let responder = responder.clone();
                    replies.spawn(async move { responder.handle_mention(mention).await });
                }
                Some(Err(e)) => warn!(error = %e, "Mention stream error"),
                None => break,
            },
            Some(joined) = replies.join_next(), if !replies.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "Reply task failed");
                }
            }
        }
    }

    while let Some(joined) = replies.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Reply task failed");
        }
    }

    info!("Mention stream ended");
}

/// Delay bounds between attempts to open the mention stream.
///
/// The delay doubles after every failed connect up to `max`, and drops back
/// to `initial` once a connect succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(320),
        }
    }
}

impl ReconnectBackoff {
    fn next(self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// Keep a mention listener running for the life of the process.
///
/// `connect` opens a fresh stream. Whenever the stream ends or fails to
/// open, the listener waits out the backoff and connects again. Never
/// returns; abort the task to stop it.
pub async fn listen_for_mentions<C, Fut, S>(
    responder: MentionResponder,
    mut connect: C,
    backoff: ReconnectBackoff,
) where
    C: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<S, SocialError>> + Send,
    S: Stream<Item = Result<Mention, SocialError>> + Send,
{
    let mut delay = backoff.initial;

    loop {
        match connect().await {
            Ok(stream) => {
                delay = backoff.initial;
                run_mention_listener(responder.clone(), stream).await;
                warn!(retry_in_ms = millis(delay), "Mention stream disconnected");
            }
            Err(e) => {
                error!(error = %e, retry_in_ms = millis(delay), "Failed to open mention stream");
                tokio::time::sleep(delay).await;
                delay = backoff.next(delay);
                continue;
            }
        }
        tokio::time::sleep(delay).await;
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use charity_yeti_core::{PostId, SocialUser, SocialUserId};

    use super::*;
    use crate::config::ResponderConfig;
    use crate::responder::tests::{RecordingClient, responder};
    use crate::social::SocialClient;

    fn mention(post_id: u64, author: &str, honorary: Option<&str>) -> Mention {
        Mention {
            post_id: PostId::new(post_id),
            author_screen_name: author.to_string(),
            in_reply_to_screen_name: honorary.map(String::from),
            in_reply_to_user: SocialUserId::default(),
            text: "@charityyeti".to_string(),
        }
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_listener() {
        let client = Arc::new(RecordingClient::default());
        let events = futures::stream::iter(vec![
            Ok(mention(1, "alice", Some("bob"))),
            Err(SocialError::Response("garbled".to_string())),
            Ok(mention(2, "carol", None)),
            Ok(mention(3, "dave", Some("erin"))),
        ]);

        run_mention_listener(responder(client.clone(), true), events).await;

        let mut replied_to: Vec<_> = client.posted().into_iter().map(|(_, id)| id).collect();
        replied_to.sort_by_key(|id| id.map(|p| p.as_u64()));
        assert_eq!(replied_to, vec![Some(PostId::new(1)), Some(PostId::new(3))]);
    }

    /// Posts slowly for one author so ordering of completion can be observed.
    struct SlowClient {
        slow_author: &'static str,
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SocialClient for SlowClient {
        async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError> {
            Err(SocialError::Api(format!("unexpected lookup of {id}")))
        }

        async fn post_status(
            &self,
            text: &str,
            in_reply_to: Option<PostId>,
        ) -> Result<PostId, SocialError> {
            if text.starts_with(&format!("Hi @{}!", self.slow_author)) {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            self.finished.lock().unwrap().push(text.to_string());
            Ok(in_reply_to.unwrap_or_default())
        }
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let backoff = ReconnectBackoff {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(12),
        };
        assert_eq!(backoff.next(Duration::from_secs(5)), Duration::from_secs(10));
        assert_eq!(backoff.next(Duration::from_secs(10)), Duration::from_secs(12));
        assert_eq!(backoff.next(Duration::from_secs(12)), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_listener_reconnects_after_stream_ends() {
        let client = Arc::new(RecordingClient::default());
        let connects = Arc::new(AtomicUsize::new(0));

        let attempts = connects.clone();
        let connect = move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                match attempt {
                    0 => Err(SocialError::Api("stream unavailable".to_string())),
                    1 => Ok(futures::stream::iter(vec![Ok(mention(1, "alice", Some("bob")))])),
                    2 => Ok(futures::stream::iter(vec![Ok(mention(2, "carol", Some("dave")))])),
                    _ => Err(SocialError::Api("no more batches".to_string())),
                }
            }
        };
        let backoff = ReconnectBackoff {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(40),
        };

        let task = tokio::spawn(listen_for_mentions(
            responder(client.clone(), true),
            connect,
            backoff,
        ));

        tokio::time::timeout(Duration::from_secs(5), async {
            while client.posted().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        task.abort();

        let mut replied_to: Vec<_> = client.posted().into_iter().map(|(_, id)| id).collect();
        replied_to.sort_by_key(|id| id.map(|p| p.as_u64()));
        assert_eq!(replied_to, vec![Some(PostId::new(1)), Some(PostId::new(2))]);
        assert!(connects.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_slow_reply_does_not_block_next_mention() {
        let client = Arc::new(SlowClient {
            slow_author: "alice",
            finished: Mutex::new(Vec::new()),
        });
        let responder = MentionResponder::new(
            client.clone(),
            ResponderConfig {
                send_responses: true,
                ..ResponderConfig::default()
            },
        );
        let events = futures::stream::iter(vec![
            Ok(mention(1, "alice", Some("bob"))),
            Ok(mention(2, "carol", Some("dave"))),
        ]);

        run_mention_listener(responder, events).await;

        let finished = client.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), 2);
        assert!(finished[0].starts_with("Hi @carol!"));
        assert!(finished[1].starts_with("Hi @alice!"));
    }
}
