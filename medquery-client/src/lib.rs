#![warn(missing_docs)]
//! # medquery-client
//!
//! Typed surface of the medquery data layer: the queries, mutations,
//! search coordination and display formatting that views bind to.
//!
//! [`QueryClient`] wraps a [`QueryCache`](medquery::QueryCache) and an
//! [`ApiClient`](medquery_api::ApiClient); its methods return
//! [`QueryHandle`]s that know their cache key, fetcher and freshness
//! policy, and its consent mutations invalidate the affected listings
//! before resolving. [`SearchCoordinator`] debounces a search box and
//! resets dependent pagination on commit; [`format`] holds the pure
//! helpers for addresses, hashes, timestamps and counters.

/// Typed, decoded handles over cache entries.
pub mod handle;

/// Pure display formatters.
pub mod format;

mod mutations;

/// Query definitions, per-query freshness policies and [`QueryClient`].
pub mod queries;

/// Debounced search with dependent pagination.
pub mod search;

pub use handle::{QueryBinding, QueryHandle, QueryResult};
pub use queries::QueryClient;
pub use search::SearchCoordinator;

pub use medquery::{DebounceState, QueryCache};
pub use medquery_api::{
    ApiClient, Consent, ConsentStatus, ConsentUpdate, MedicalRecord, NewConsent, Patient,
    PatientPage, Stats, Transaction,
};
pub use medquery_core::FetchError;
