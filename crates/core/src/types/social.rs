//! Social platform projections.

use serde::{Deserialize, Serialize};

use super::id::{PostId, SocialUserId};

/// Minimal read-only projection of a social platform profile.
///
/// Built fresh per lookup; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialUser {
    pub id: SocialUserId,
    pub name: String,
    /// Only present when the platform exposes it to our token.
    pub email: Option<String>,
    pub screen_name: String,
}

/// A post that mentioned the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub post_id: PostId,
    /// Screen name of the user who wrote the mention.
    pub author_screen_name: String,
    /// Screen name the mention replied to, if the platform resolved it.
    pub in_reply_to_screen_name: Option<String>,
    /// User the mention replied to. Unset for quote posts.
    #[serde(default)]
    pub in_reply_to_user: SocialUserId,
    pub text: String,
}
