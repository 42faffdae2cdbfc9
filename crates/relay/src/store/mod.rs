//! Donation store adapters.
//!
//! The relay only ever appends: a donation is written once against an
//! existing donor document and never updated or deleted here.
//!
//! # Adapters
//!
//! - [`PgDonationStore`] - `PostgreSQL`, used in production
//! - [`InMemoryDonationStore`] - process-local, for tests and local development

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use charity_yeti_core::{DonationId, DonationRecord, DonorDocumentId};
use thiserror::Error;

pub use memory::InMemoryDonationStore;
pub use postgres::{MIGRATOR, PgDonationStore, create_pool};

/// Errors that can occur while recording a donation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The donor document does not exist.
    #[error("donor document not found: {0}")]
    DonorNotFound(DonorDocumentId),

    /// A donation for this transaction was already recorded.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store is not accepting writes.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Appends donation records to donor documents.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DonationStore: Send + Sync {
    /// Append a donation to an existing donor document.
    ///
    /// Returns the identifier of the stored record.
    async fn append(
        &self,
        donor: &DonorDocumentId,
        record: &DonationRecord,
    ) -> Result<DonationId, StoreError>;

    /// Check that the store can accept writes.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
