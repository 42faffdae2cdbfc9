//! Twitter API v2 client.
//!
//! Lookups and posting use the user-context token. The filtered stream uses
//! the app-only bearer token and yields one [`Mention`] per matching post.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use charity_yeti_core::{Mention, PostId, SocialUser, SocialUserId};
use futures::Stream;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::types::{
    CreateTweetRequest, CreateTweetResponse, ReplySettings, StreamEnvelope, UserResponse,
    describe_problems,
};
use super::{SocialClient, SocialError};
use crate::config::TwitterConfig;

/// Upper bound for lookups and posts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The stream sends a keep-alive newline every 20 seconds.
const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(60);

const USER_FIELDS: &str = "id,name,username";
const STREAM_EXPANSIONS: &str = "author_id,in_reply_to_user_id";

/// Stream of mentions from the filtered stream endpoint.
///
/// Malformed lines are logged and skipped. A transport failure is yielded
/// once as an error and ends the stream.
pub type MentionStream = Pin<Box<dyn Stream<Item = Result<Mention, SocialError>> + Send>>;

/// Twitter API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct TwitterClient {
    inner: Arc<TwitterClientInner>,
}

struct TwitterClientInner {
    client: Client,
    api_base: Url,
    bearer_token: SecretString,
    user_token: SecretString,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_base", &self.inner.api_base.as_str())
            .field("bearer_token", &"[REDACTED]")
            .field("user_token", &"[REDACTED]")
            .finish()
    }
}

impl TwitterClient {
    /// Create a new Twitter client.
    ///
    /// # Errors
    ///
    /// Returns `SocialError::Request` if the HTTP client fails to build.
    pub fn new(config: &TwitterConfig) -> Result<Self, SocialError> {
        let client = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .read_timeout(STREAM_READ_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(TwitterClientInner {
                client,
                api_base: config.api_base.clone(),
                bearer_token: config.bearer_token.clone(),
                user_token: config.user_token.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SocialError> {
        Ok(self.inner.api_base.join(path)?)
    }

    /// Open the filtered stream and decode mentions as they arrive.
    ///
    /// Which posts count as mentions is decided by the stream rules
    /// registered for the app, not by this client.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened or the platform
    /// rejects the connection.
    #[instrument(skip(self))]
    pub async fn mention_stream(&self) -> Result<MentionStream, SocialError> {
        let mut url = self.endpoint("2/tweets/search/stream")?;
        url.query_pairs_mut()
            .append_pair("expansions", STREAM_EXPANSIONS)
            .append_pair("user.fields", USER_FIELDS)
            .append_pair("tweet.fields", "author_id,in_reply_to_user_id");

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(self.inner.bearer_token.expose_secret())
            .send()
            .await?;
        let response = check_status(response).await?;

        info!("Connected to mention stream");

        Ok(Box::pin(stream! {
            use futures::StreamExt;

            let mut buffer = Vec::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);

                        while let Some(line) = extract_line(&mut buffer) {
                            match parse_stream_line(&line) {
                                Some(Ok(mention)) => yield Ok(mention),
                                Some(Err(e)) => warn!(error = %e, "Skipping malformed stream line"),
                                None => debug!("Stream keep-alive"),
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(SocialError::Request(e));
                        break;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl SocialClient for TwitterClient {
    #[instrument(skip(self))]
    async fn fetch_user_by_id(&self, id: SocialUserId) -> Result<SocialUser, SocialError> {
        let mut url = self.endpoint(&format!("2/users/{id}"))?;
        url.query_pairs_mut().append_pair("user.fields", USER_FIELDS);

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(self.inner.user_token.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;

        let result: UserResponse = response
            .json()
            .await
            .map_err(|e| SocialError::Response(e.to_string()))?;

        match result.data {
            Some(user) => SocialUser::try_from(user),
            None => Err(SocialError::Api(describe_problems(&result.errors))),
        }
    }

    #[instrument(skip(self, text))]
    async fn post_status(
        &self,
        text: &str,
        in_reply_to: Option<PostId>,
    ) -> Result<PostId, SocialError> {
        let request = CreateTweetRequest {
            text,
            reply: in_reply_to.map(|id| ReplySettings {
                in_reply_to_tweet_id: id.to_string(),
            }),
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("2/tweets")?)
            .bearer_auth(self.inner.user_token.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let result: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| SocialError::Response(e.to_string()))?;

        let created = result
            .data
            .ok_or_else(|| SocialError::Api(describe_problems(&result.errors)))?;

        let id = created
            .id
            .parse::<PostId>()
            .map_err(|e| SocialError::Response(format!("invalid post id {:?}: {e}", created.id)))?;

        debug!(post_id = %id, "Status posted");
        Ok(id)
    }
}

/// Turn a non-success response into `SocialError::Status`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SocialError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SocialError::Status { status, body })
}

/// Remove one complete line from the buffer, without its terminator.
fn extract_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let idx = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=idx).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Decode one stream line. Blank lines are keep-alives and yield `None`.
fn parse_stream_line(line: &[u8]) -> Option<Result<Mention, SocialError>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    Some(
        serde_json::from_slice::<StreamEnvelope>(line)
            .map_err(|e| SocialError::Response(e.to_string()))
            .and_then(Mention::try_from),
    )
}
