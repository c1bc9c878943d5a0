//! Integration tests for mutation execution and invalidation ordering.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use medquery::{
    FetchError, MutationExecutor, MutationRequest, Param, QueryCache, QueryKey, QueryPolicy,
    SharedFetcher, fetch_fn,
};
use serde_json::json;

/// Simulated server-side consent store.
struct ConsentServer {
    purpose: Mutex<String>,
    reads: AtomicUsize,
}

impl ConsentServer {
    fn new(purpose: &str) -> Arc<Self> {
        Arc::new(ConsentServer {
            purpose: Mutex::new(purpose.to_string()),
            reads: AtomicUsize::new(0),
        })
    }

    fn fetcher(self: &Arc<Self>) -> SharedFetcher {
        let server = Arc::clone(self);
        fetch_fn(move || {
            let server = Arc::clone(&server);
            async move {
                server.reads.fetch_add(1, Ordering::SeqCst);
                let purpose = server.purpose.lock().unwrap().clone();
                Ok(json!({ "consents": [{ "purpose": purpose }] }))
            }
        })
    }
}

fn consents_key() -> QueryKey {
    QueryKey::new("consents", vec![Param::from("patient-001")])
}

fn policy() -> QueryPolicy {
    QueryPolicy::new(Duration::from_secs(60), Duration::from_secs(300))
}

fn served_purpose(snapshot: &medquery::QuerySnapshot) -> String {
    snapshot.data.as_ref().unwrap()["consents"][0]["purpose"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test(start_paused = true)]
async fn successful_mutation_invalidates_and_next_read_is_fresh() {
    let cache = QueryCache::new();
    let executor = MutationExecutor::new(cache.clone());
    let server = ConsentServer::new("Research Study Participation");
    let key = consents_key();

    let before = cache.fetch(&key, server.fetcher(), policy()).await;
    assert_eq!(served_purpose(&before), "Research Study Participation");

    let write_target = Arc::clone(&server);
    let request = MutationRequest::new(async move {
        *write_target.purpose.lock().unwrap() = "Insurance Provider Access".to_string();
        Ok(json!({ "id": "consent-1", "status": "active" }))
    })
    .invalidates("consents");
    executor.execute(request).await.unwrap();

    let after = cache.fetch(&key, server.fetcher(), policy()).await;
    assert_eq!(served_purpose(&after), "Insurance Provider Access");
    assert_eq!(server.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_mutation_performs_no_invalidation() {
    let cache = QueryCache::new();
    let executor = MutationExecutor::new(cache.clone());
    let server = ConsentServer::new("Research Study Participation");
    let key = consents_key();

    cache.fetch(&key, server.fetcher(), policy()).await;

    let request = MutationRequest::<serde_json::Value>::new(async {
        Err(FetchError::Http {
            status: 422,
            message: "signature missing".into(),
        })
    })
    .invalidates("consents");
    let error = executor.execute(request).await.unwrap_err();
    assert_eq!(error.status(), Some(422));

    // Entry is still fresh: no refetch happens.
    cache.fetch(&key, server.fetcher(), policy()).await;
    assert_eq!(server.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn mutation_invalidates_every_declared_kind() {
    let cache = QueryCache::new();
    let executor = MutationExecutor::new(cache.clone());
    let consents = ConsentServer::new("a");
    let stats = ConsentServer::new("b");
    let consents_key = consents_key();
    let stats_key = QueryKey::bare("stats");

    cache.fetch(&consents_key, consents.fetcher(), policy()).await;
    cache.fetch(&stats_key, stats.fetcher(), policy()).await;

    let request = MutationRequest::new(async { Ok(json!({ "ok": true })) })
        .invalidates("consents")
        .invalidates("stats");
    executor.execute(request).await.unwrap();

    cache.fetch(&consents_key, consents.fetcher(), policy()).await;
    cache.fetch(&stats_key, stats.fetcher(), policy()).await;
    assert_eq!(consents.reads.load(Ordering::SeqCst), 2);
    assert_eq!(stats.reads.load(Ordering::SeqCst), 2);
}
