#![warn(missing_docs)]
//! # medquery
//!
//! Cached query and mutation engine for a healthcare-consent client.
//!
//! The engine sits between view code and a remote REST API. Reads go through
//! a process-wide [`QueryCache`](cache::QueryCache) that serves cached data,
//! revalidates stale entries in the background, and never issues two fetches
//! for the same key at once. Writes go through a
//! [`MutationExecutor`](mutation::MutationExecutor) that invalidates
//! dependent resource kinds after the remote call succeeds.

/// The query cache.
///
/// Keyed by [`QueryKey`], entries track freshness ([`Freshness`]), a single
/// in-flight fetch, and the last-good value for stale-while-error surfacing.
pub mod cache;

/// Trailing-edge debounce for search inputs.
///
/// Every raw write restarts the timer; the committed value is published only
/// after the delay elapses with no further writes.
pub mod debounce;

/// Cache entry state and read snapshots.
pub mod entry;

/// Write operations with declarative cache invalidation.
///
/// A [`MutationRequest`](mutation::MutationRequest) declares which resource
/// kinds become stale when the remote call succeeds; the executor performs
/// the call exactly once and invalidates all of them, or none on failure.
pub mod mutation;

/// Observer bindings onto cache entries.
///
/// [`subscribe`](cache::QueryCache::subscribe) returns a handle; listeners
/// run synchronously after every entry state transition. Entries are evicted
/// once the last subscriber is gone and the value has expired.
pub mod subscription;

pub use cache::QueryCache;
pub use debounce::{DebounceState, DebouncedValue};
pub use entry::{QuerySnapshot, QueryStatus};
pub use mutation::{MutationExecutor, MutationRequest};
pub use subscription::{Listener, Subscription};

pub use medquery_core::{
    CacheValue, FetchError, FetchResult, Fetcher, Freshness, Param, Payload, QueryKey, QueryPolicy,
    SharedFetcher, fetch_fn,
};
