//! Typed handles over cache entries.
//!
//! A [`QueryHandle`] pairs a cache key with its fetcher and policy and
//! decodes erased payloads back into the query's model type. The
//! [`QueryResult`] it produces is the shape views bind to: `data`,
//! `error`, `is_loading`, `is_error`, `is_fetching`.

use std::marker::PhantomData;
use std::sync::Arc;

use medquery::{QueryCache, QuerySnapshot, Subscription};
use medquery_core::{FetchError, QueryKey, QueryPolicy, SharedFetcher};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Decoded view of a cache entry.
///
/// `data` and `error` can be populated at the same time: a failed refresh
/// keeps the last-good value while surfacing the error.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    /// Decoded last-good value, if any fetch has ever succeeded.
    pub data: Option<T>,
    /// Error from the most recent failed fetch or decode.
    pub error: Option<FetchError>,
    /// Whether the very first fetch for this key is still running.
    pub is_loading: bool,
    /// Whether the entry's status is Error.
    pub is_error: bool,
    /// Whether any fetch is currently in flight.
    pub is_fetching: bool,
}

impl<T: DeserializeOwned> QueryResult<T> {
    fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        let (data, decode_error) = match snapshot.decode::<T>() {
            Ok(data) => (data, None),
            Err(error) => (None, Some(error)),
        };
        let error = decode_error.or_else(|| snapshot.error.clone());
        QueryResult {
            is_loading: snapshot.is_loading(),
            is_error: snapshot.is_error() || (error.is_some() && data.is_none()),
            is_fetching: snapshot.is_fetching,
            data,
            error,
        }
    }
}

/// A typed, cached read: one key, one fetcher, one policy.
///
/// Handles are cheap to build and clone; the cache entry behind them is
/// shared, so two handles for the same parameters observe the same state.
pub struct QueryHandle<T> {
    cache: QueryCache,
    key: QueryKey,
    fetcher: SharedFetcher,
    policy: QueryPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for QueryHandle<T> {
    fn clone(&self) -> Self {
        QueryHandle {
            cache: self.cache.clone(),
            key: self.key.clone(),
            fetcher: Arc::clone(&self.fetcher),
            policy: self.policy.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for QueryHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("key", &self.key.to_string())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: DeserializeOwned> QueryHandle<T> {
    pub(crate) fn new(
        cache: QueryCache,
        key: QueryKey,
        fetcher: SharedFetcher,
        policy: QueryPolicy,
    ) -> Self {
        QueryHandle {
            cache,
            key,
            fetcher,
            policy,
            _marker: PhantomData,
        }
    }

    /// The cache key this handle reads.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Resolves once the entry has settled. Fresh and stale entries return
    /// immediately; cold and expired entries wait for the fetch.
    pub async fn fetch(&self) -> QueryResult<T> {
        let snapshot = self
            .cache
            .fetch(&self.key, Arc::clone(&self.fetcher), self.policy.clone())
            .await;
        QueryResult::from_snapshot(&snapshot)
    }

    /// Non-blocking read: serves whatever is cached and kicks off any
    /// needed fetch without awaiting it. Completion is observed through
    /// [`bind`](Self::bind) or a later [`fetch`](Self::fetch).
    pub fn read(&self) -> QueryResult<T> {
        let snapshot = self
            .cache
            .read(&self.key, Arc::clone(&self.fetcher), self.policy.clone());
        QueryResult::from_snapshot(&snapshot)
    }

    /// The current state of the entry, without fetching.
    pub fn snapshot(&self) -> QueryResult<T> {
        QueryResult::from_snapshot(&self.cache.snapshot(&self.key))
    }

    /// Forces a background refetch regardless of freshness. The cached
    /// value keeps being served while the refetch runs.
    pub fn refresh(&self) {
        self.cache
            .refresh(&self.key, Arc::clone(&self.fetcher), self.policy.clone());
    }

    /// Binds a listener to the entry and starts the query's periodic
    /// refetch, when its policy has one.
    ///
    /// The listener runs synchronously after every state transition, with
    /// the decoded result. Dropping the returned [`QueryBinding`] detaches
    /// the listener and stops the periodic refetch; once the last binding
    /// is gone and the value has expired the entry is evicted.
    pub fn bind<F>(&self, listener: F) -> QueryBinding
    where
        F: Fn(QueryResult<T>) + Send + Sync + 'static,
        T: 'static,
    {
        let subscription = self.cache.subscribe(
            &self.key,
            Box::new(move |snapshot| listener(QueryResult::from_snapshot(snapshot))),
        );
        QueryBinding {
            _subscription: subscription,
            refetch_task: self.policy.refetch_interval.map(|every| {
                let handle = self.clone();
                debug!(key = %self.key, interval = ?every, "starting periodic refetch");
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(every);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick fires immediately; the bind itself
                    // already triggered a read if the caller wanted one.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        handle.refresh();
                    }
                })
            }),
        }
    }
}

/// A live binding of a listener (and optional periodic refetch) to a query.
///
/// Detaches on drop. Unbinding does not cancel an in-flight fetch; its
/// result may simply be discarded with the entry.
pub struct QueryBinding {
    _subscription: Subscription,
    refetch_task: Option<JoinHandle<()>>,
}

impl QueryBinding {
    /// Explicitly detaches the binding.
    pub fn unbind(self) {}
}

impl Drop for QueryBinding {
    fn drop(&mut self) {
        if let Some(task) = &self.refetch_task {
            task.abort();
        }
    }
}
