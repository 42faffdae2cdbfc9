//! In-memory donation store.
//!
//! Useful for tests and local development. Donor documents must be
//! registered with [`InMemoryDonationStore::with_donor`] before donations can
//! be appended to them, mirroring the foreign key in `PostgreSQL`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use charity_yeti_core::{DonationId, DonationRecord, DonorDocumentId};

use super::{DonationStore, StoreError};

type DonorDocuments = HashMap<DonorDocumentId, Vec<(DonationId, DonationRecord)>>;

/// Process-local donation store.
///
/// Clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryDonationStore {
    documents: Arc<RwLock<DonorDocuments>>,
    next_id: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
    unavailable: Option<String>,
}

impl InMemoryDonationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects every write with the given reason.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Register an existing donor document.
    #[must_use]
    pub fn with_donor(self, donor: impl Into<String>) -> Self {
        if let Ok(mut documents) = self.documents.write() {
            documents.entry(DonorDocumentId::new(donor)).or_default();
        }
        self
    }

    /// Donations recorded against a donor document, in append order.
    #[must_use]
    pub fn donations(&self, donor: &DonorDocumentId) -> Vec<DonationRecord> {
        self.documents
            .read()
            .ok()
            .and_then(|documents| {
                documents
                    .get(donor)
                    .map(|records| records.iter().map(|(_, r)| r.clone()).collect())
            })
            .unwrap_or_default()
    }

    /// Number of `append` calls, successful or not.
    #[must_use]
    pub fn append_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DonationStore for InMemoryDonationStore {
    async fn append(
        &self,
        donor: &DonorDocumentId,
        record: &DonationRecord,
    ) -> Result<DonationId, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.unavailable {
            return Err(StoreError::Unavailable(reason.clone()));
        }

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::Unavailable("donation store lock poisoned".to_string()))?;

        let duplicate = documents
            .values()
            .flatten()
            .any(|(_, existing)| existing.transaction_id == record.transaction_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "transaction {} already recorded",
                record.transaction_id
            )));
        }

        let records = documents
            .get_mut(donor)
            .ok_or_else(|| StoreError::DonorNotFound(donor.clone()))?;

        let next = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = DonationId::new(
            i32::try_from(next)
                .map_err(|_| StoreError::Unavailable("donation id space exhausted".to_string()))?,
        );
        records.push((id, record.clone()));
        Ok(id)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match &self.unavailable {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}
