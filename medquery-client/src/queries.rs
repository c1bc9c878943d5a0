//! Typed query definitions binding the API client to the cache.
//!
//! [`QueryClient`] is what view code holds: one instance per application,
//! wrapping a [`QueryCache`], an [`ApiClient`] and a [`MutationExecutor`].
//! Each method returns a [`QueryHandle`] that knows its cache key, its
//! fetcher and its freshness policy, so views never build keys or policies
//! themselves.

use std::time::Duration;

use medquery::{MutationExecutor, QueryCache};
use medquery_api::{
    ApiClient, Consent, ConsentStatus, MedicalRecord, Patient, PatientPage, Stats, Transaction,
};
use medquery_core::{FetchError, Param, Payload, QueryKey, QueryPolicy};
use serde::Serialize;

use crate::handle::QueryHandle;

/// Freshness policies per query, mirroring the lifetimes the views were
/// tuned for: listings revalidate after a couple of minutes, single
/// patients live longer, and the stats dashboard refreshes itself every
/// 30 seconds while visible.
pub mod policies {
    use super::*;

    /// Patient listings: 2 min fresh, 5 min cached.
    pub fn patients() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(120), Duration::from_secs(300))
    }

    /// A single patient: 5 min fresh, 10 min cached.
    pub fn patient() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(300), Duration::from_secs(600))
    }

    /// A patient's records: 2 min fresh, 5 min cached.
    pub fn patient_records() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(120), Duration::from_secs(300))
    }

    /// Consent listings: 1 min fresh, 5 min cached.
    pub fn consents() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(60), Duration::from_secs(300))
    }

    /// Transaction listings: 2 min fresh, 5 min cached.
    pub fn transactions() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(120), Duration::from_secs(300))
    }

    /// Platform stats: 1 min fresh, 5 min cached, refetched every 30 s
    /// while subscribed.
    pub fn stats() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(60), Duration::from_secs(300))
            .with_refetch_interval(Duration::from_secs(30))
    }
}

pub(crate) fn encode<T: Serialize>(value: T) -> Result<Payload, FetchError> {
    serde_json::to_value(value)
        .map_err(|e| FetchError::validation(format!("unencodable payload: {e}")))
}

/// Entry point for typed, cached reads and invalidating writes.
///
/// Cloning is cheap and shares the cache, the HTTP connection pool and the
/// mutation executor.
///
/// # Example
///
/// ```ignore
/// let client = QueryClient::new(QueryCache::new(), ApiClient::new(base_url)?);
/// let page = client.patients(1, 10, None).fetch().await;
/// ```
#[derive(Clone, Debug)]
pub struct QueryClient {
    pub(crate) cache: QueryCache,
    pub(crate) api: ApiClient,
    pub(crate) executor: MutationExecutor,
}

impl QueryClient {
    /// Binds an API client to a cache.
    pub fn new(cache: QueryCache, api: ApiClient) -> Self {
        let executor = MutationExecutor::new(cache.clone());
        QueryClient {
            cache,
            api,
            executor,
        }
    }

    /// The underlying cache, for direct snapshots and invalidation.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The underlying API client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// One page of patients, optionally filtered by a search term.
    ///
    /// The search term is part of the key, so typing a new term reads a
    /// different entry instead of clobbering the previous page.
    pub fn patients(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> QueryHandle<PatientPage> {
        let search = search.filter(|s| !s.is_empty()).map(str::to_string);
        let key = QueryKey::new(
            "patients",
            vec![page.into(), limit.into(), search.as_deref().into()],
        );
        let api = self.api.clone();
        self.handle(key, policies::patients(), move || {
            let api = api.clone();
            let search = search.clone();
            async move { encode(api.patients(page, limit, search.as_deref()).await?) }
        })
    }

    /// A single patient by id.
    pub fn patient(&self, id: &str) -> QueryHandle<Patient> {
        let id = id.to_string();
        let key = QueryKey::new("patient", vec![Param::from(id.as_str())]);
        let api = self.api.clone();
        self.handle(key, policies::patient(), move || {
            let api = api.clone();
            let id = id.clone();
            async move { encode(api.patient(&id).await?) }
        })
    }

    /// A patient's medical records.
    pub fn patient_records(&self, id: &str) -> QueryHandle<Vec<MedicalRecord>> {
        let id = id.to_string();
        let key = QueryKey::new("patient-records", vec![Param::from(id.as_str())]);
        let api = self.api.clone();
        self.handle(key, policies::patient_records(), move || {
            let api = api.clone();
            let id = id.clone();
            async move { encode(api.patient_records(&id).await?) }
        })
    }

    /// Consents, optionally filtered by patient and status.
    ///
    /// Invalidated as a whole by consent mutations: every `consents` key
    /// refetches regardless of its filters.
    pub fn consents(
        &self,
        patient_id: Option<&str>,
        status: Option<ConsentStatus>,
    ) -> QueryHandle<Vec<Consent>> {
        let patient_id = patient_id.filter(|s| !s.is_empty()).map(str::to_string);
        let key = QueryKey::new(
            "consents",
            vec![
                patient_id.as_deref().into(),
                status.map(|s| s.as_str()).into(),
            ],
        );
        let api = self.api.clone();
        self.handle(key, policies::consents(), move || {
            let api = api.clone();
            let patient_id = patient_id.clone();
            async move { encode(api.consents(patient_id.as_deref(), status).await?) }
        })
    }

    /// Recorded blockchain transactions, optionally filtered by wallet.
    pub fn transactions(
        &self,
        wallet_address: Option<&str>,
        limit: u32,
    ) -> QueryHandle<Vec<Transaction>> {
        let wallet = wallet_address.filter(|s| !s.is_empty()).map(str::to_string);
        let key = QueryKey::new(
            "transactions",
            vec![wallet.as_deref().into(), limit.into()],
        );
        let api = self.api.clone();
        self.handle(key, policies::transactions(), move || {
            let api = api.clone();
            let wallet = wallet.clone();
            async move { encode(api.transactions(wallet.as_deref(), limit).await?) }
        })
    }

    /// Platform-wide counters for the statistics dashboard.
    pub fn stats(&self) -> QueryHandle<Stats> {
        let key = QueryKey::bare("stats");
        let api = self.api.clone();
        self.handle(key, policies::stats(), move || {
            let api = api.clone();
            async move { encode(api.stats().await?) }
        })
    }

    fn handle<T, F, Fut>(&self, key: QueryKey, policy: QueryPolicy, fetch: F) -> QueryHandle<T>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, FetchError>> + Send + 'static,
    {
        QueryHandle::new(
            self.cache.clone(),
            key,
            medquery_core::fetch_fn(fetch),
            policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QueryClient {
        QueryClient::new(
            QueryCache::new(),
            ApiClient::new("http://localhost:3001/api").unwrap(),
        )
    }

    #[test]
    fn patients_key_carries_all_params() {
        let handle = client().patients(2, 10, Some("ada"));
        assert_eq!(handle.key().to_string(), "patients:2&10&ada");
    }

    #[test]
    fn empty_search_keys_like_no_search() {
        let with_empty = client().patients(1, 10, Some(""));
        let without = client().patients(1, 10, None);
        assert_eq!(with_empty.key(), without.key());
    }

    #[test]
    fn consents_key_keeps_param_positions() {
        let by_status = client().consents(None, Some(ConsentStatus::Active));
        assert_eq!(by_status.key().to_string(), "consents:-&active");
        let by_patient = client().consents(Some("patient-001"), None);
        assert_eq!(by_patient.key().to_string(), "consents:patient-001&-");
    }

    #[test]
    fn stats_policy_refetches_periodically() {
        let policy = policies::stats();
        assert_eq!(policy.refetch_interval, Some(Duration::from_secs(30)));
    }
}
