//! The process-wide query cache.
//!
//! [`QueryCache`] holds one entry per [`QueryKey`] and mediates every read:
//!
//! - **Fresh** entries are served without touching the network.
//! - **Stale** entries are served immediately while a background
//!   revalidation runs (stale-while-revalidate).
//! - **Expired or absent** entries behave like a first read: callers block
//!   until the fetch settles.
//! - At most one fetch is in flight per key; concurrent readers attach to
//!   the existing fetch instead of duplicating it.
//!
//! The cache has a defined lifecycle: create one per application (or per
//! test) and pass it explicitly into the query layer. Cloning is cheap and
//! shares the same key space.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use medquery_core::{QueryKey, QueryPolicy, SharedFetcher};
use tokio::sync::watch;
use tracing::{Instrument, debug, debug_span, warn};

use crate::entry::{FetchContext, QueryEntry, QuerySnapshot, ReadPlan};
use crate::subscription::{Listener, Subscription};

/// State shared by cache clones and outstanding subscriptions.
pub(crate) struct CacheShared {
    entries: DashMap<QueryKey, Arc<QueryEntry>>,
}

impl CacheShared {
    fn entry(&self, key: &QueryKey) -> Arc<QueryEntry> {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(QueryEntry::new(key.clone())))
            .clone()
    }

    /// Detaches a listener and, when it was the last one, arranges eviction
    /// once the entry's value has expired.
    pub(crate) fn release_listener(self: &Arc<Self>, key: &QueryKey, id: u64) {
        let Some(entry) = self.entries.get(key).map(|e| Arc::clone(&e)) else {
            return;
        };
        entry.remove_listener(id);
        if entry.listener_count() > 0 {
            return;
        }
        match entry.expires_at() {
            // Nothing cached: the entry can go as soon as no fetch holds it.
            None => self.evict_if_possible(key),
            // No expiry window: kept until explicit invalidation.
            Some(expires_at) if expires_at == DateTime::<Utc>::MAX_UTC => {}
            Some(expires_at) => {
                let delay = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                let shared = Arc::downgrade(self);
                let key = key.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(shared) = shared.upgrade() {
                            shared.evict_if_possible(&key);
                        }
                    });
                } else {
                    self.evict_if_possible(&key);
                }
            }
        }
    }

    fn evict_if_possible(&self, key: &QueryKey) {
        let now = Utc::now();
        // remove_if re-checks under the shard lock so a subscriber that
        // re-attached in the meantime keeps the entry alive.
        self.entries.remove_if(key, |_, entry| entry.can_evict(now));
    }
}

/// Keyed cache of asynchronous read results.
///
/// See the [module docs](self) for the serving rules. All methods may be
/// called from any task; fetches are spawned on the ambient Tokio runtime.
#[derive(Clone)]
pub struct QueryCache {
    shared: Arc<CacheShared>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.shared.entries.len())
            .finish()
    }
}

impl QueryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        QueryCache {
            shared: Arc::new(CacheShared {
                entries: DashMap::new(),
            }),
        }
    }

    /// Returns the current snapshot for `key` without fetching.
    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        match self.shared.entries.get(key) {
            Some(entry) => entry.snapshot(),
            None => QuerySnapshot::idle(),
        }
    }

    /// Non-blocking read: serves whatever is cached and kicks off any fetch
    /// the entry needs, without awaiting it.
    ///
    /// This is the call a view makes on render; completion is observed
    /// through [`subscribe`](Self::subscribe) or a later
    /// [`fetch`](Self::fetch).
    pub fn read(
        &self,
        key: &QueryKey,
        fetcher: SharedFetcher,
        policy: QueryPolicy,
    ) -> QuerySnapshot {
        let entry = self.shared.entry(key);
        entry.set_context(fetcher.clone(), policy.clone());
        match entry.plan_read(Utc::now()) {
            ReadPlan::ServeFresh | ReadPlan::AwaitInFlight => entry.snapshot(),
            ReadPlan::Revalidate => {
                let snapshot = entry.snapshot();
                Self::spawn_driver(Arc::clone(&entry), FetchContext { fetcher, policy });
                snapshot
            }
            ReadPlan::Fetch => {
                let snapshot = entry.snapshot();
                entry.notify(&snapshot);
                Self::spawn_driver(Arc::clone(&entry), FetchContext { fetcher, policy });
                snapshot
            }
        }
    }

    /// Blocking read: resolves once the entry has settled.
    ///
    /// Fresh entries return immediately. Stale entries return immediately
    /// with `is_fetching = true` while the revalidation runs in the
    /// background. Cold or expired entries (and readers arriving while a
    /// fetch is in flight) wait for the fetch to settle.
    pub async fn fetch(
        &self,
        key: &QueryKey,
        fetcher: SharedFetcher,
        policy: QueryPolicy,
    ) -> QuerySnapshot {
        let entry = self.shared.entry(key);
        entry.set_context(fetcher.clone(), policy.clone());
        // Subscribe before planning so a completion between the plan and
        // the wait cannot be missed.
        let rx = entry.watch();
        match entry.plan_read(Utc::now()) {
            ReadPlan::ServeFresh => {
                debug!(key = %key, "cache hit");
                entry.snapshot()
            }
            ReadPlan::AwaitInFlight => {
                Self::await_settled(&entry, rx).await;
                entry.snapshot()
            }
            ReadPlan::Revalidate => {
                debug!(key = %key, "stale hit, revalidating in background");
                let snapshot = entry.snapshot();
                Self::spawn_driver(Arc::clone(&entry), FetchContext { fetcher, policy });
                snapshot
            }
            ReadPlan::Fetch => {
                debug!(key = %key, "cache miss");
                entry.notify(&entry.snapshot());
                Self::spawn_driver(Arc::clone(&entry), FetchContext { fetcher, policy });
                Self::await_settled(&entry, rx).await;
                entry.snapshot()
            }
        }
    }

    /// Forces a background refetch of `key`, regardless of freshness.
    ///
    /// The cached value keeps being served while the refetch runs. No-op
    /// when a fetch is already in flight. This is what periodic refetch
    /// uses; ordinary reads go through [`fetch`](Self::fetch).
    pub fn refresh(&self, key: &QueryKey, fetcher: SharedFetcher, policy: QueryPolicy) {
        let entry = self.shared.entry(key);
        entry.set_context(fetcher, policy);
        if let Some(context) = entry.begin_refetch() {
            debug!(key = %key, "forced refresh");
            Self::spawn_driver(entry, context);
        }
    }

    /// Marks every entry of the given resource kind stale and expired.
    ///
    /// Entries with active subscribers refetch immediately in the
    /// background; the rest refetch on their next read. Either way no read
    /// issued after this call can return the previously cached data.
    pub fn invalidate(&self, kind: &str) {
        let now = Utc::now();
        let matching: Vec<Arc<QueryEntry>> = self
            .shared
            .entries
            .iter()
            .filter(|item| item.key().matches_kind(kind))
            .map(|item| Arc::clone(item.value()))
            .collect();
        debug!(kind, entries = matching.len(), "invalidating resource kind");
        for entry in matching {
            entry.expire(now);
            if entry.listener_count() > 0
                && let Some(context) = entry.begin_refetch()
            {
                Self::spawn_driver(Arc::clone(&entry), context);
            }
            entry.notify(&entry.snapshot());
        }
    }

    /// Binds a listener to `key`.
    ///
    /// The listener runs synchronously after every state transition of the
    /// entry. Dropping the returned [`Subscription`] (or calling
    /// [`Subscription::unsubscribe`]) detaches it; once the last listener is
    /// gone and the value has expired the entry is evicted.
    pub fn subscribe(&self, key: &QueryKey, listener: Listener) -> Subscription {
        let entry = self.shared.entry(key);
        let id = entry.add_listener(listener);
        Subscription::new(Arc::clone(&self.shared), key.clone(), id)
    }

    /// Whether an entry currently exists for `key`.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.shared.entries.contains_key(key)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    /// Drops every entry. Intended for application shutdown and test
    /// teardown; outstanding fetches complete but their results are
    /// discarded with the entries.
    pub fn clear(&self) {
        self.shared.entries.clear();
    }

    fn spawn_driver(entry: Arc<QueryEntry>, context: FetchContext) {
        let key = entry.key().clone();
        let span = debug_span!("query_fetch", key = %key);
        tokio::spawn(
            async move {
                let result = context.fetcher.fetch().await;
                if let Err(error) = &result {
                    warn!(key = %key, %error, "fetch failed");
                }
                let snapshot = entry.complete(result, &context.policy, Utc::now());
                entry.notify(&snapshot);
            }
            .instrument(span),
        );
    }

    async fn await_settled(entry: &Arc<QueryEntry>, mut rx: watch::Receiver<u64>) {
        while entry.is_in_flight() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}
