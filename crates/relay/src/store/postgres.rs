//! `PostgreSQL` donation store.
//!
//! # Tables
//!
//! - `donor_documents` - One row per donor, created outside the relay
//! - `donations` - Appended donation records, keyed by `transaction_id`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/relay/migrations/` and run via:
//! ```bash
//! cargo run -p charity-yeti-cli -- migrate
//! ```

use std::time::Duration;

use async_trait::async_trait;
use charity_yeti_core::{DonationId, DonationRecord, DonorDocumentId};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use super::{DonationStore, StoreError};

/// Embedded relay migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Donation store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgDonationStore {
    pool: PgPool,
}

impl PgDonationStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonationStore for PgDonationStore {
    #[instrument(skip(self, record), fields(donor = %donor, transaction_id = %record.transaction_id))]
    async fn append(
        &self,
        donor: &DonorDocumentId,
        record: &DonationRecord,
    ) -> Result<DonationId, StoreError> {
        sqlx::query_scalar::<_, DonationId>(
            r"
            INSERT INTO donations
                (donor_document_id, transaction_id, original_tweet_id,
                 invoker_tweet_id, honorary, donation_value)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(donor)
        .bind(&record.transaction_id)
        .bind(&record.original_tweet_id)
        .bind(&record.invoker_tweet_id)
        .bind(&record.honorary)
        .bind(&record.donation_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, donor))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map constraint violations to their domain meaning.
fn classify(err: sqlx::Error, donor: &DonorDocumentId) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StoreError::DonorNotFound(donor.clone());
        }
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(err)
}
