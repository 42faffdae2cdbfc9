//! Application state shared across handlers.

use std::sync::Arc;

use crate::payments::MiddlewareClient;
use crate::store::DonationStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds no mutable state of its own.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    middleware: MiddlewareClient,
    store: Arc<dyn DonationStore>,
    honorary: String,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `middleware` - Payment middleware client
    /// * `store` - Where donations are recorded
    /// * `honorary` - Honorary written into every donation record
    #[must_use]
    pub fn new(
        middleware: MiddlewareClient,
        store: Arc<dyn DonationStore>,
        honorary: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                middleware,
                store,
                honorary: honorary.into(),
            }),
        }
    }

    /// Get a reference to the payment middleware client.
    #[must_use]
    pub fn middleware(&self) -> &MiddlewareClient {
        &self.inner.middleware
    }

    /// Get a reference to the donation store.
    #[must_use]
    pub fn store(&self) -> &dyn DonationStore {
        self.inner.store.as_ref()
    }

    /// Honorary recorded with each donation.
    #[must_use]
    pub fn honorary(&self) -> &str {
        &self.inner.honorary
    }
}
