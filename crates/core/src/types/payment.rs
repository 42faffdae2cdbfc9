//! Inbound payment authorization payload.
//!
//! The front end posts this after the payment form has tokenized a card. The
//! relay checks the nonce and forwards everything else to the payment
//! middleware untouched.

use core::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::de::{lenient_user_id, null_as_default};
use super::donation::DonorDocumentId;
use super::id::SocialUserId;

/// Errors raised when an inbound payment request fails validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The payment method nonce is empty or absent.
    #[error("payment method nonce is required")]
    MissingNonce,
}

/// Payment authorization data received from the donation front end.
///
/// Absent or `null` fields decode to their empty value, so a payload without
/// `paymentMethodNonce` decodes fine and is rejected by [`Self::validate`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentAuthorizationRequest {
    /// Donor document the resulting donation is appended to.
    #[serde(deserialize_with = "null_as_default")]
    pub donor_document_id: DonorDocumentId,
    /// Post that started the donation thread.
    #[serde(deserialize_with = "null_as_default")]
    pub original_tweet_id: String,
    /// Post that invoked the bot.
    #[serde(deserialize_with = "null_as_default")]
    pub invoker_tweet_id: String,
    /// User the invoking post replied to (0 when there was none).
    ///
    /// Accepted as a number or a numeric string.
    #[serde(deserialize_with = "lenient_user_id")]
    pub in_reply_to_user: SocialUserId,
    /// One-time token for the tokenized payment method.
    #[serde(rename = "paymentMethodNonce", deserialize_with = "null_as_default")]
    pub nonce: String,
    /// Decimal amount, kept as the client sent it.
    #[serde(deserialize_with = "null_as_default")]
    pub amount: String,
    /// Opaque device fingerprint for fraud screening.
    #[serde(deserialize_with = "null_as_default")]
    pub device_data: String,
    /// Processing options forwarded to the middleware.
    pub options: ProcessingOptions,
}

impl PaymentAuthorizationRequest {
    /// Check the request before any network call is made.
    ///
    /// Only the nonce is required. Every other field is forwarded as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingNonce`] if the nonce is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nonce.is_empty() {
            return Err(ValidationError::MissingNonce);
        }
        Ok(())
    }
}

impl fmt::Debug for PaymentAuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentAuthorizationRequest")
            .field("donor_document_id", &self.donor_document_id)
            .field("original_tweet_id", &self.original_tweet_id)
            .field("invoker_tweet_id", &self.invoker_tweet_id)
            .field("in_reply_to_user", &self.in_reply_to_user)
            .field("nonce", &"[REDACTED]")
            .field("amount", &self.amount)
            .field("device_data", &"[REDACTED]")
            .field("options", &self.options)
            .finish()
    }
}

/// A single named processing flag, e.g. `submitForSettlement: true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOption {
    pub name: String,
    pub enabled: bool,
}

impl ProcessingOption {
    /// Create a new processing option.
    #[must_use]
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }
}

/// Ordered processing options.
///
/// On the wire this is an array of single-key objects:
///
/// ```json
/// [{"submitForSettlement": true}, {"storeInVault": false}]
/// ```
///
/// An object carrying several keys is flattened in document order, so the
/// relative order of every flag is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOptions(Vec<ProcessingOption>);

impl ProcessingOptions {
    /// Create options from an ordered list of flags.
    #[must_use]
    pub const fn new(options: Vec<ProcessingOption>) -> Self {
        Self(options)
    }

    /// Look up a flag by name. The first occurrence wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.iter().find(|o| o.name == name).map(|o| o.enabled)
    }

    /// Iterate over the flags in order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessingOption> {
        self.0.iter()
    }

    /// Number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ProcessingOption> for ProcessingOptions {
    fn from_iter<I: IntoIterator<Item = ProcessingOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ProcessingOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Single<'a>(&'a ProcessingOption);

        impl Serialize for Single<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(&self.0.name, &self.0.enabled)?;
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for option in &self.0 {
            seq.serialize_element(&Single(option))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ProcessingOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// One JSON object, possibly with several flags, read in document order.
        struct FlagGroup(Vec<ProcessingOption>);

        impl<'de> Deserialize<'de> for FlagGroup {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct GroupVisitor;

                impl<'de> Visitor<'de> for GroupVisitor {
                    type Value = FlagGroup;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("an object of option names to booleans")
                    }

                    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FlagGroup, A::Error> {
                        let mut flags = Vec::with_capacity(map.size_hint().unwrap_or(1));
                        while let Some((name, enabled)) = map.next_entry::<String, bool>()? {
                            flags.push(ProcessingOption { name, enabled });
                        }
                        Ok(FlagGroup(flags))
                    }
                }

                deserializer.deserialize_map(GroupVisitor)
            }
        }

        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = ProcessingOptions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of option objects")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ProcessingOptions, A::Error> {
                let mut options = Vec::new();
                while let Some(FlagGroup(flags)) = seq.next_element()? {
                    options.extend(flags);
                }
                Ok(ProcessingOptions(options))
            }

            // Go clients encode a nil slice as null
            fn visit_unit<E: serde::de::Error>(self) -> Result<ProcessingOptions, E> {
                Ok(ProcessingOptions::default())
            }
        }

        deserializer.deserialize_any(OptionsVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn sample_payload() -> serde_json::Value {
        json!({
            "donorDocumentId": "5f1b2c3d4e5f6a7b8c9d0e1f",
            "originalTweetId": "1460323737035677698",
            "invokerTweetId": "1460323999999999999",
            "inReplyToUser": 783214,
            "paymentMethodNonce": "tokencc_bh_abc123",
            "amount": "10.00",
            "deviceData": "{\"device_session_id\":\"xyz\"}",
            "options": [{"submitForSettlement": true}, {"storeInVault": false}]
        })
    }

    #[test]
    fn test_decode_full_payload() {
        let request: PaymentAuthorizationRequest =
            serde_json::from_value(sample_payload()).unwrap();

        assert_eq!(request.donor_document_id.as_str(), "5f1b2c3d4e5f6a7b8c9d0e1f");
        assert_eq!(request.nonce, "tokencc_bh_abc123");
        assert_eq!(request.amount, "10.00");
        assert_eq!(request.in_reply_to_user, SocialUserId::new(783_214));
        assert_eq!(request.options.len(), 2);
        assert_eq!(request.options.get("submitForSettlement"), Some(true));
        assert_eq!(request.options.get("storeInVault"), Some(false));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_encode_preserves_wire_names_and_values() {
        let request: PaymentAuthorizationRequest =
            serde_json::from_value(sample_payload()).unwrap();
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded, sample_payload());
    }

    #[rstest]
    #[case::absent(json!({"amount": "5.00"}))]
    #[case::empty(json!({"amount": "5.00", "paymentMethodNonce": ""}))]
    fn test_missing_nonce_fails_validation(#[case] payload: serde_json::Value) {
        let request: PaymentAuthorizationRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.validate(), Err(ValidationError::MissingNonce));
    }

    #[test]
    fn test_wrong_field_type_is_a_decode_error() {
        let result: Result<PaymentAuthorizationRequest, _> =
            serde_json::from_value(json!({"paymentMethodNonce": 12}));
        assert!(result.is_err());
    }

    #[test]
    fn test_null_pass_through_fields_decode_as_empty() {
        let mut payload = sample_payload();
        payload["deviceData"] = serde_json::Value::Null;
        payload["originalTweetId"] = serde_json::Value::Null;
        payload["inReplyToUser"] = serde_json::Value::Null;

        let request: PaymentAuthorizationRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.device_data, "");
        assert_eq!(request.original_tweet_id, "");
        assert!(request.in_reply_to_user.is_unset());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_null_nonce_fails_validation_not_decoding() {
        let request: PaymentAuthorizationRequest =
            serde_json::from_value(json!({"paymentMethodNonce": null})).unwrap();
        assert_eq!(request.validate(), Err(ValidationError::MissingNonce));
    }

    #[rstest]
    #[case::number(json!(783_214), 783_214)]
    #[case::string(json!("783214"), 783_214)]
    #[case::large_string(json!("1460323737035677698"), 1_460_323_737_035_677_698)]
    #[case::empty_string(json!(""), 0)]
    fn test_in_reply_to_user_accepts_number_or_string(
        #[case] raw: serde_json::Value,
        #[case] expected: u64,
    ) {
        let request: PaymentAuthorizationRequest =
            serde_json::from_value(json!({"inReplyToUser": raw})).unwrap();
        assert_eq!(request.in_reply_to_user, SocialUserId::new(expected));
    }

    #[test]
    fn test_non_numeric_in_reply_to_user_is_rejected() {
        let result: Result<PaymentAuthorizationRequest, _> =
            serde_json::from_value(json!({"inReplyToUser": "alice"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_multi_key_option_object_is_flattened_in_order() {
        let options: ProcessingOptions =
            serde_json::from_str(r#"[{"b": true, "a": false}, {"c": true}]"#).unwrap();
        let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);

        let encoded = serde_json::to_string(&options).unwrap();
        assert_eq!(encoded, r#"[{"b":true},{"a":false},{"c":true}]"#);
    }

    #[test]
    fn test_null_options_decode_as_empty() {
        let options: ProcessingOptions = serde_json::from_str("null").unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_non_boolean_option_is_rejected() {
        let result: Result<ProcessingOptions, _> =
            serde_json::from_str(r#"[{"submitForSettlement": "yes"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_nonce_and_device_data() {
        let request: PaymentAuthorizationRequest =
            serde_json::from_value(sample_payload()).unwrap();
        let debug_output = format!("{request:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tokencc_bh_abc123"));
        assert!(!debug_output.contains("device_session_id"));
        assert!(debug_output.contains("10.00"));
    }
}
