//! Cached value types with freshness metadata.
//!
//! [`CacheValue`] wraps fetched data with three timestamps:
//!
//! - `fetched_at` - when the fetch that produced the data completed
//! - `stale_at` - when the data should start refreshing in the background
//! - `expires_at` - when the data must no longer be served
//!
//! The invariant `stale_at <= expires_at` is enforced on construction, so a
//! value can never be expired without also being stale. Evaluating the
//! timestamps yields a [`Freshness`]:
//!
//! - [`Freshness::Fresh`] - serve from cache, no fetch
//! - [`Freshness::Stale`] - serve from cache, revalidate in the background
//! - [`Freshness::Expired`] - treat as absent, fetch before serving

use chrono::{DateTime, Utc};

/// Freshness state of a cached value relative to its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Data is fresh and valid.
    Fresh,
    /// Data is stale but not expired (usable, refresh in background).
    Stale,
    /// Data has expired (must refresh before use).
    Expired,
}

/// A cached value with freshness metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    fetched_at: DateTime<Utc>,
    stale_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<T> CacheValue<T> {
    /// Creates a new cache value.
    ///
    /// `stale_at` is clamped to `expires_at` so the staleness invariant
    /// holds regardless of the supplied windows.
    pub fn new(
        data: T,
        fetched_at: DateTime<Utc>,
        stale_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        CacheValue {
            data,
            fetched_at,
            stale_at: stale_at.min(expires_at),
            expires_at,
        }
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns when the fetch that produced this data completed.
    #[inline]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Returns when the data becomes stale.
    #[inline]
    pub fn stale_at(&self) -> DateTime<Utc> {
        self.stale_at
    }

    /// Returns when the data expires.
    #[inline]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Consumes the cache value and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Evaluates freshness at the given instant.
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        if self.expires_at <= now {
            Freshness::Expired
        } else if self.stale_at <= now {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// Evaluates freshness against the current wall clock.
    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Utc::now())
    }

    /// Forces the value to be both stale and expired as of `now`.
    ///
    /// Used by prefix invalidation: the next read must refetch rather than
    /// serve this data.
    pub fn expire_now(&mut self, now: DateTime<Utc>) {
        self.stale_at = self.stale_at.min(now);
        self.expires_at = self.expires_at.min(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn value_with(stale_secs: i64, expire_secs: i64) -> (CacheValue<&'static str>, DateTime<Utc>) {
        let now = Utc::now();
        let value = CacheValue::new(
            "data",
            now,
            now + Duration::seconds(stale_secs),
            now + Duration::seconds(expire_secs),
        );
        (value, now)
    }

    #[test]
    fn freshness_transitions() {
        let (value, now) = value_with(10, 60);
        assert_eq!(value.freshness_at(now), Freshness::Fresh);
        assert_eq!(value.freshness_at(now + Duration::seconds(10)), Freshness::Stale);
        assert_eq!(value.freshness_at(now + Duration::seconds(60)), Freshness::Expired);
    }

    #[test]
    fn stale_never_exceeds_expire() {
        let (value, now) = value_with(120, 60);
        assert_eq!(value.stale_at(), value.expires_at());
        assert_eq!(value.freshness_at(now + Duration::seconds(61)), Freshness::Expired);
    }

    #[test]
    fn expire_now_forces_refetch() {
        let (mut value, now) = value_with(30, 60);
        value.expire_now(now);
        assert_eq!(value.freshness_at(now), Freshness::Expired);
    }
}
