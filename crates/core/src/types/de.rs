//! Lenient field decoders shared by the wire types.

use serde::{Deserialize, Deserializer};

use super::id::SocialUserId;

/// Decode a JSON `null` the same way as an absent field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a user id sent either as a number or as a decimal string.
///
/// Browsers stringify snowflakes to avoid losing precision. `null` and the
/// empty string both mean "no user".
pub fn lenient_user_id<'de, D>(deserializer: D) -> Result<SocialUserId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(SocialUserId::default()),
        Some(Raw::Number(id)) => Ok(SocialUserId::new(id)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(SocialUserId::default()),
        Some(Raw::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
