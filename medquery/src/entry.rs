//! Cache entry state and read snapshots.
//!
//! A [`QueryEntry`] is the shared state behind one [`QueryKey`]: the
//! last-good value with its freshness timestamps, the current status, the
//! last error, and the single in-flight fetch flag. Readers and subscribers
//! observe entries through immutable [`QuerySnapshot`]s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use medquery_core::{
    CacheValue, FetchError, FetchResult, Freshness, Payload, QueryKey, QueryPolicy, SharedFetcher,
};
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::subscription::Listener;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// No read has touched this key yet.
    #[default]
    Idle,
    /// A cold fetch is running and no previous value exists.
    Loading,
    /// The last fetch succeeded.
    Success,
    /// The last fetch failed. A stale last-good value may still be present.
    Error,
}

/// Immutable view of a cache entry at one point in time.
///
/// `data` and `error` can be present simultaneously: a failed background
/// refresh keeps the last-good value while recording the error
/// (stale-while-error).
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    /// Lifecycle status of the entry.
    pub status: QueryStatus,
    /// Last-good payload, if any fetch has ever succeeded.
    pub data: Option<Arc<Payload>>,
    /// Error from the most recent failed fetch, cleared on success.
    pub error: Option<FetchError>,
    /// Whether a fetch is currently in flight for this key.
    pub is_fetching: bool,
    /// When the last successful fetch completed.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl QuerySnapshot {
    /// Snapshot of a key no read has touched.
    pub fn idle() -> Self {
        QuerySnapshot {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            fetched_at: None,
        }
    }

    /// Whether this is an initial load with no data to show.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Whether the most recent fetch failed.
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Whether the entry holds a successfully fetched value.
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Decodes the payload into a typed model.
    ///
    /// Returns `Ok(None)` when no data is present. A payload that does not
    /// match the expected shape becomes [`FetchError::Validation`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, FetchError> {
        match &self.data {
            None => Ok(None),
            Some(payload) => serde_json::from_value((**payload).clone())
                .map(Some)
                .map_err(FetchError::validation),
        }
    }
}

/// How a read of an entry must proceed. Produced under the entry lock by
/// [`QueryEntry::plan_read`], which already applied the matching state
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadPlan {
    /// Cached value is fresh; serve it without fetching.
    ServeFresh,
    /// Another fetch is in flight; attach to it.
    AwaitInFlight,
    /// Cached value is stale; serve it and revalidate in the background.
    /// The in-flight flag is now held by this caller.
    Revalidate,
    /// Entry is cold (absent or expired); a blocking fetch is required.
    /// The in-flight flag is now held by this caller.
    Fetch,
}

/// Fetcher and policy captured from the most recent read, kept so
/// invalidation can refetch without the caller re-supplying them.
#[derive(Clone)]
pub(crate) struct FetchContext {
    pub(crate) fetcher: SharedFetcher,
    pub(crate) policy: QueryPolicy,
}

#[derive(Default)]
struct EntryState {
    value: Option<CacheValue<Arc<Payload>>>,
    status: QueryStatus,
    error: Option<FetchError>,
    in_flight: bool,
}

/// Shared state behind one query key.
pub(crate) struct QueryEntry {
    key: QueryKey,
    state: Mutex<EntryState>,
    // Bumped after every state transition; readers attached to an in-flight
    // fetch wait on this channel.
    revision: watch::Sender<u64>,
    context: Mutex<Option<FetchContext>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

impl QueryEntry {
    pub(crate) fn new(key: QueryKey) -> Self {
        let (revision, _) = watch::channel(0);
        QueryEntry {
            key,
            state: Mutex::new(EntryState::default()),
            revision,
            context: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn key(&self) -> &QueryKey {
        &self.key
    }

    pub(crate) fn snapshot(&self) -> QuerySnapshot {
        let state = self.state.lock().expect("entry state poisoned");
        QuerySnapshot {
            status: state.status,
            data: state.value.as_ref().map(|v| Arc::clone(v.data())),
            error: state.error.clone(),
            is_fetching: state.in_flight,
            fetched_at: state.value.as_ref().map(|v| v.fetched_at()),
        }
    }

    pub(crate) fn set_context(&self, fetcher: SharedFetcher, policy: QueryPolicy) {
        *self.context.lock().expect("entry context poisoned") =
            Some(FetchContext { fetcher, policy });
    }

    /// Decides how a read must proceed and applies the matching transition.
    ///
    /// At most one caller can leave this method holding the in-flight flag.
    pub(crate) fn plan_read(&self, now: DateTime<Utc>) -> ReadPlan {
        let mut state = self.state.lock().expect("entry state poisoned");
        if state.in_flight {
            return ReadPlan::AwaitInFlight;
        }
        match state.value.as_ref().map(|v| v.freshness_at(now)) {
            Some(Freshness::Fresh) => ReadPlan::ServeFresh,
            Some(Freshness::Stale) => {
                state.in_flight = true;
                ReadPlan::Revalidate
            }
            Some(Freshness::Expired) | None => {
                // Expired entries behave like a first read: the old value is
                // no longer servable.
                state.value = None;
                state.status = QueryStatus::Loading;
                state.error = None;
                state.in_flight = true;
                ReadPlan::Fetch
            }
        }
    }

    /// Records the outcome of a fetch and releases the in-flight flag.
    ///
    /// A failure over a previous success keeps the last-good value so
    /// callers see both `data` and `error` (stale-while-error).
    pub(crate) fn complete(
        &self,
        result: FetchResult,
        policy: &QueryPolicy,
        now: DateTime<Utc>,
    ) -> QuerySnapshot {
        {
            let mut state = self.state.lock().expect("entry state poisoned");
            state.in_flight = false;
            match result {
                Ok(payload) => {
                    state.value = Some(policy.stamp(Arc::new(payload), now));
                    state.status = QueryStatus::Success;
                    state.error = None;
                }
                Err(error) => {
                    state.status = QueryStatus::Error;
                    state.error = Some(error);
                }
            }
        }
        self.snapshot()
    }

    /// Marks the cached value stale and expired as of `now`.
    pub(crate) fn expire(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().expect("entry state poisoned");
        if let Some(value) = state.value.as_mut() {
            value.expire_now(now);
        }
    }

    /// Acquires the in-flight flag for an invalidation refetch.
    ///
    /// Returns the stored fetch context, or `None` when a fetch is already
    /// running or no read has ever supplied a fetcher.
    pub(crate) fn begin_refetch(&self) -> Option<FetchContext> {
        let context = self.context.lock().expect("entry context poisoned").clone()?;
        let mut state = self.state.lock().expect("entry state poisoned");
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(context)
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.state.lock().expect("entry state poisoned").in_flight
    }

    /// Instant after which an idle entry may be evicted, if any.
    pub(crate) fn expires_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock().expect("entry state poisoned");
        state.value.as_ref().map(|v| v.expires_at())
    }

    /// Whether the entry can be dropped from the cache: no subscribers, no
    /// in-flight fetch, and nothing servable left.
    pub(crate) fn can_evict(&self, now: DateTime<Utc>) -> bool {
        if self.listener_count() > 0 {
            return false;
        }
        let state = self.state.lock().expect("entry state poisoned");
        if state.in_flight {
            return false;
        }
        match state.value.as_ref() {
            None => true,
            Some(value) => value.freshness_at(now) == Freshness::Expired,
        }
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Publishes a state transition: bumps the revision and runs every
    /// listener synchronously with the given snapshot.
    pub(crate) fn notify(&self, snapshot: &QuerySnapshot) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        let listeners = self.listeners.lock().expect("entry listeners poisoned");
        for (_, listener) in listeners.iter() {
            listener(snapshot);
        }
    }

    pub(crate) fn add_listener(&self, listener: Listener) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("entry listeners poisoned")
            .push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        self.listeners
            .lock()
            .expect("entry listeners poisoned")
            .retain(|(listener_id, _)| *listener_id != id);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().expect("entry listeners poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry() -> QueryEntry {
        QueryEntry::new(QueryKey::bare("stats"))
    }

    fn policy() -> QueryPolicy {
        QueryPolicy::new(Duration::from_secs(60), Duration::from_secs(300))
    }

    #[test]
    fn cold_read_then_success() {
        let entry = entry();
        let now = Utc::now();
        assert_eq!(entry.plan_read(now), ReadPlan::Fetch);
        assert_eq!(entry.snapshot().status, QueryStatus::Loading);

        let snapshot = entry.complete(Ok(serde_json::json!({"n": 1})), &policy(), now);
        assert!(snapshot.is_success());
        assert!(!snapshot.is_fetching);
        assert_eq!(entry.plan_read(now), ReadPlan::ServeFresh);
    }

    #[test]
    fn second_reader_attaches_to_flight() {
        let entry = entry();
        let now = Utc::now();
        assert_eq!(entry.plan_read(now), ReadPlan::Fetch);
        assert_eq!(entry.plan_read(now), ReadPlan::AwaitInFlight);
    }

    #[test]
    fn stale_value_revalidates_once() {
        let entry = entry();
        let now = Utc::now();
        entry.plan_read(now);
        entry.complete(Ok(serde_json::json!({"n": 1})), &policy(), now);

        let later = now + chrono::Duration::seconds(61);
        assert_eq!(entry.plan_read(later), ReadPlan::Revalidate);
        assert_eq!(entry.plan_read(later), ReadPlan::AwaitInFlight);
    }

    #[test]
    fn failure_keeps_last_good_value() {
        let entry = entry();
        let now = Utc::now();
        entry.plan_read(now);
        entry.complete(Ok(serde_json::json!({"n": 1})), &policy(), now);

        let later = now + chrono::Duration::seconds(61);
        entry.plan_read(later);
        let snapshot = entry.complete(
            Err(FetchError::Network("connection reset".into())),
            &policy(),
            later,
        );
        assert!(snapshot.is_error());
        assert!(snapshot.data.is_some(), "stale-while-error keeps data");
        assert!(snapshot.error.is_some());
    }

    #[test]
    fn expired_value_reads_cold() {
        let entry = entry();
        let now = Utc::now();
        entry.plan_read(now);
        entry.complete(Ok(serde_json::json!({"n": 1})), &policy(), now);

        let later = now + chrono::Duration::seconds(301);
        assert_eq!(entry.plan_read(later), ReadPlan::Fetch);
        assert!(entry.snapshot().data.is_none());
    }

    #[test]
    fn decode_mismatch_is_validation_error() {
        let snapshot = QuerySnapshot {
            status: QueryStatus::Success,
            data: Some(Arc::new(serde_json::json!({"n": "text"}))),
            error: None,
            is_fetching: false,
            fetched_at: Some(Utc::now()),
        };
        #[derive(Debug, serde::Deserialize)]
        struct Typed {
            #[allow(dead_code)]
            n: u32,
        }
        let err = snapshot.decode::<Typed>().unwrap_err();
        assert!(matches!(err, FetchError::Validation(_)));
    }
}
