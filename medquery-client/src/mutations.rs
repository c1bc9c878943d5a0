//! Consent write operations.
//!
//! Every consent mutation runs through the [`MutationExecutor`] and
//! declares `consents` as the resource kind it invalidates: when the
//! remote call succeeds, every cached consent listing refetches before the
//! mutation resolves, so a read issued afterwards observes post-mutation
//! state. A failed call leaves the cache untouched.

use medquery::MutationRequest;
use medquery_api::{Consent, ConsentUpdate, NewConsent};
use medquery_core::FetchError;

use crate::queries::QueryClient;

impl QueryClient {
    /// Creates a signed consent and invalidates consent listings.
    pub async fn create_consent(&self, consent: NewConsent) -> Result<Consent, FetchError> {
        let api = self.api.clone();
        let request =
            MutationRequest::new(async move { api.create_consent(&consent).await })
                .invalidates("consents");
        self.executor.execute(request).await
    }

    /// Applies a status update to a consent and invalidates consent
    /// listings.
    pub async fn update_consent(
        &self,
        id: &str,
        update: ConsentUpdate,
    ) -> Result<Consent, FetchError> {
        let api = self.api.clone();
        let id = id.to_string();
        let request =
            MutationRequest::new(async move { api.update_consent(&id, &update).await })
                .invalidates("consents");
        self.executor.execute(request).await
    }

    /// Activates a consent.
    ///
    /// The transaction hash is supplied by the external chain integration
    /// once the activation has been anchored; activation without one is
    /// valid and simply omits the field.
    pub async fn activate_consent(
        &self,
        id: &str,
        blockchain_tx_hash: Option<String>,
    ) -> Result<Consent, FetchError> {
        self.update_consent(id, ConsentUpdate::activate(blockchain_tx_hash))
            .await
    }

    /// Revokes a consent.
    pub async fn revoke_consent(&self, id: &str) -> Result<Consent, FetchError> {
        self.update_consent(id, ConsentUpdate::revoke()).await
    }
}
