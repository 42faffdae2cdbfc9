//! Twitter API v2 wire types.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! payloads is ignored.

use charity_yeti_core::{Mention, PostId, SocialUser, SocialUserId};
use serde::{Deserialize, Serialize};

use super::SocialError;

/// Error entry in a v2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl ApiProblem {
    fn describe(&self) -> String {
        if self.detail.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.detail)
        }
    }
}

/// Collapse a list of problems into one message.
pub fn describe_problems(problems: &[ApiProblem]) -> String {
    problems
        .iter()
        .map(ApiProblem::describe)
        .collect::<Vec<_>>()
        .join("; ")
}

/// `data` object of a user lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub confirmed_email: Option<String>,
}

impl TryFrom<UserData> for SocialUser {
    type Error = SocialError;

    fn try_from(user: UserData) -> Result<Self, Self::Error> {
        let id = user
            .id
            .parse::<SocialUserId>()
            .map_err(|e| SocialError::Response(format!("invalid user id {:?}: {e}", user.id)))?;
        Ok(Self {
            id,
            name: user.name,
            email: user.confirmed_email,
            screen_name: user.username,
        })
    }
}

/// Response of `GET /2/users/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub data: Option<UserData>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

/// Body of `POST /2/tweets`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplySettings>,
}

/// Reply target of a new post.
#[derive(Debug, Clone, Serialize)]
pub struct ReplySettings {
    pub in_reply_to_tweet_id: String,
}

/// Response of `POST /2/tweets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetResponse {
    pub data: Option<CreatedTweet>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
}

/// One line of the filtered stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    pub data: StreamTweet,
    #[serde(default)]
    pub includes: Includes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamTweet {
    pub id: String,
    pub text: String,
    pub author_id: String,
    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,
}

/// Objects expanded via `expansions=author_id,in_reply_to_user_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<UserData>,
}

impl Includes {
    fn username_of(&self, id: &str) -> Option<String> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
    }
}

impl TryFrom<StreamEnvelope> for Mention {
    type Error = SocialError;

    fn try_from(envelope: StreamEnvelope) -> Result<Self, Self::Error> {
        let StreamEnvelope { data, includes } = envelope;

        let post_id = data
            .id
            .parse::<PostId>()
            .map_err(|e| SocialError::Response(format!("invalid post id {:?}: {e}", data.id)))?;

        let author_screen_name = includes
            .username_of(&data.author_id)
            .ok_or_else(|| SocialError::Response(format!("author {} not expanded", data.author_id)))?;

        let (in_reply_to_user, in_reply_to_screen_name) = match data.in_reply_to_user_id {
            Some(raw) => {
                let id = raw.parse::<SocialUserId>().map_err(|e| {
                    SocialError::Response(format!("invalid in-reply-to user id {raw:?}: {e}"))
                })?;
                (id, includes.username_of(&raw))
            }
            None => (SocialUserId::default(), None),
        };

        Ok(Self {
            post_id,
            author_screen_name,
            in_reply_to_screen_name,
            in_reply_to_user,
            text: data.text,
        })
    }
}
