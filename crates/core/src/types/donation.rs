//! Donation records and the donor documents they are appended to.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::payment::PaymentAuthorizationRequest;
use super::transaction::Transaction;

/// Identifier of a pre-existing donor document.
///
/// Issued by the document store and supplied by the client. The relay does
/// not interpret it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorDocumentId(String);

impl DonorDocumentId {
    /// Wrap a store-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the client sent no identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DonorDocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DonorDocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for DonorDocumentId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for DonorDocumentId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for DonorDocumentId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// A donation as it is stored against a donor document.
///
/// Built once per successful middleware exchange and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub transaction_id: String,
    pub original_tweet_id: String,
    pub invoker_tweet_id: String,
    /// Screen name the donation was made in honor of.
    pub honorary: String,
    /// The charged amount. Called `amount` on the wire.
    pub donation_value: String,
}

impl DonationRecord {
    /// Build the stored record from a completed charge.
    ///
    /// The amount is the one the middleware charged, not the one the client
    /// asked for.
    #[must_use]
    pub fn from_charge(
        request: &PaymentAuthorizationRequest,
        transaction: &Transaction,
        honorary: &str,
    ) -> Self {
        Self {
            transaction_id: transaction.id.clone(),
            original_tweet_id: request.original_tweet_id.clone(),
            invoker_tweet_id: request.invoker_tweet_id.clone(),
            honorary: honorary.to_owned(),
            donation_value: transaction.amount.clone(),
        }
    }
}
