//! Trait for calling the remote data source.
//!
//! A [`Fetcher`] produces one resource payload per call. The cache engine
//! stores the fetcher alongside its entry so invalidation can trigger a
//! refetch without the caller re-supplying it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{FetchError, Payload};

/// Result of a single fetch.
pub type FetchResult = Result<Payload, FetchError>;

/// Trait for calling the remote data source with a fixed set of parameters.
///
/// The params are captured when the fetcher is built (they are part of the
/// query key), so `fetch` takes no arguments.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs one fetch against the data source.
    async fn fetch(&self) -> FetchResult;
}

/// Shared, type-erased fetcher as stored by the cache engine.
pub type SharedFetcher = Arc<dyn Fetcher>;

/// Adapter implementing [`Fetcher`] for async closures.
pub struct FnFetcher<F>(F);

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult> + Send,
{
    async fn fetch(&self) -> FetchResult {
        (self.0)().await
    }
}

/// Wraps an async closure into a [`SharedFetcher`].
///
/// # Example
///
/// ```
/// use medquery_core::fetch_fn;
///
/// let fetcher = fetch_fn(|| async { Ok(serde_json::json!({"ok": true})) });
/// ```
pub fn fetch_fn<F, Fut>(f: F) -> SharedFetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    Arc::new(FnFetcher(f))
}
