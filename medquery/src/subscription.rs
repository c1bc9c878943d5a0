//! Subscription handles binding listeners to cache entries.

use std::sync::Arc;

use medquery_core::QueryKey;

use crate::cache::CacheShared;
use crate::entry::QuerySnapshot;

/// Callback invoked synchronously after every state transition of the
/// subscribed entry.
pub type Listener = Box<dyn Fn(&QuerySnapshot) + Send + Sync>;

/// A view's binding to one cache entry.
///
/// Detaches its listener when dropped. Detaching the last listener starts
/// the eviction countdown for the entry.
pub struct Subscription {
    shared: Arc<CacheShared>,
    key: QueryKey,
    id: u64,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(shared: Arc<CacheShared>, key: QueryKey, id: u64) -> Self {
        Subscription {
            shared,
            key,
            id,
            active: true,
        }
    }

    /// The key this subscription is bound to.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Explicitly detaches the listener.
    ///
    /// Equivalent to dropping the subscription.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.shared.release_listener(&self.key, self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.active)
            .finish()
    }
}
