//! Per-query cache behavior policy.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::value::CacheValue;

/// Staleness and expiry windows for one query.
///
/// Durations serialize in human-readable form (e.g. "2m", "30s").
/// A `None` window means the corresponding transition never happens:
/// no `stale_after` means the data never goes stale on its own, no
/// `expire_after` means it is kept until explicitly invalidated.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct QueryPolicy {
    /// How long fetched data stays fresh before background revalidation.
    #[serde(default, with = "humantime_serde")]
    pub stale_after: Option<Duration>,
    /// How long fetched data may be served at all.
    #[serde(default, with = "humantime_serde")]
    pub expire_after: Option<Duration>,
    /// Interval for periodic refetch while the query has subscribers.
    #[serde(default, with = "humantime_serde")]
    pub refetch_interval: Option<Duration>,
}

impl QueryPolicy {
    /// Creates a policy with the given staleness and expiry windows.
    pub fn new(stale_after: Duration, expire_after: Duration) -> Self {
        Self {
            stale_after: Some(stale_after),
            expire_after: Some(expire_after),
            refetch_interval: None,
        }
    }

    /// Sets a periodic refetch interval for subscribed queries.
    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    /// Wraps freshly fetched data in a [`CacheValue`] stamped from `now`.
    pub fn stamp<T>(&self, data: T, now: DateTime<Utc>) -> CacheValue<T> {
        let stale_at = self
            .stale_after
            .and_then(|d| TimeDelta::from_std(d).ok())
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let expires_at = self
            .expire_after
            .and_then(|d| TimeDelta::from_std(d).ok())
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CacheValue::new(data, now, stale_at, expires_at)
    }
}
