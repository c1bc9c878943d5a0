//! Write operations with declarative cache invalidation.

use futures::future::BoxFuture;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::cache::QueryCache;
use medquery_core::FetchError;

/// A write operation together with the resource kinds it makes stale.
///
/// The request is declarative: it names kinds, not concrete keys. Which
/// entries actually exist under those kinds is the cache's concern.
///
/// # Example
///
/// ```ignore
/// let request = MutationRequest::new(async move { api.create_consent(&data).await })
///     .invalidates("consents");
/// executor.execute(request).await?;
/// ```
pub struct MutationRequest<T> {
    operation: BoxFuture<'static, Result<T, FetchError>>,
    invalidates: Vec<SmolStr>,
}

impl<T> MutationRequest<T> {
    /// Wraps a write operation with no invalidations declared yet.
    pub fn new<F>(operation: F) -> Self
    where
        F: std::future::Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        MutationRequest {
            operation: Box::pin(operation),
            invalidates: Vec::new(),
        }
    }

    /// Declares a resource kind that becomes stale when the operation
    /// succeeds.
    pub fn invalidates(mut self, kind: impl Into<SmolStr>) -> Self {
        self.invalidates.push(kind.into());
        self
    }
}

/// Executes mutations and applies their invalidations.
///
/// The remote call runs exactly once per request (no retry). Invalidation
/// is all-or-nothing: every declared kind is invalidated after the call
/// succeeds, and none on failure. Because invalidation completes before
/// `execute` resolves, any read issued after a successful mutation observes
/// post-mutation state.
#[derive(Clone, Debug)]
pub struct MutationExecutor {
    cache: QueryCache,
}

impl MutationExecutor {
    /// Creates an executor that invalidates through the given cache.
    pub fn new(cache: QueryCache) -> Self {
        MutationExecutor { cache }
    }

    /// Runs the request's operation and, on success, invalidates every
    /// declared resource kind.
    ///
    /// Failures reject with the underlying [`FetchError`] and leave the
    /// cache untouched; user-facing reporting is the caller's job.
    pub async fn execute<T>(&self, request: MutationRequest<T>) -> Result<T, FetchError> {
        let MutationRequest {
            operation,
            invalidates,
        } = request;
        match operation.await {
            Ok(output) => {
                for kind in &invalidates {
                    self.cache.invalidate(kind);
                }
                debug!(kinds = ?invalidates, "mutation succeeded, caches invalidated");
                Ok(output)
            }
            Err(error) => {
                warn!(%error, "mutation failed, skipping invalidation");
                Err(error)
            }
        }
    }
}
