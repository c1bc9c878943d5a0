//! End-to-end flows: typed queries through the cache against a mock server.

use medquery_client::{ApiClient, ConsentStatus, QueryCache, QueryClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn query_client(server: &MockServer) -> QueryClient {
    QueryClient::new(QueryCache::new(), ApiClient::new(&server.uri()).unwrap())
}

fn consent_body(status: &str, tx_hash: Option<&str>) -> serde_json::Value {
    json!({
        "consents": [{
            "id": "consent-1",
            "patientId": "patient-001",
            "purpose": "Research Study Participation",
            "status": status,
            "blockchainTxHash": tx_hash,
        }]
    })
}

#[tokio::test]
async fn activation_invalidates_and_the_next_read_sees_it() {
    let server = MockServer::start().await;

    // First listing read sees the consent pending; reads after the
    // activation see it active.
    Mock::given(method("GET"))
        .and(path("/consents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(consent_body("pending", None)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/consents"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(consent_body("active", Some("0xanchor"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/consents/consent-1"))
        .and(body_json(json!({
            "status": "active",
            "blockchainTxHash": "0xanchor"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "consent-1",
            "patientId": "patient-001",
            "purpose": "Research Study Participation",
            "status": "active",
            "blockchainTxHash": "0xanchor"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = query_client(&server).await;
    let listing = client.consents(None, None);

    let before = listing.fetch().await;
    let consents = before.data.unwrap();
    assert_eq!(consents[0].status, ConsentStatus::Pending);

    // A second read within the freshness window stays off the network.
    listing.fetch().await;
    let gets_before = count_gets(&server).await;
    assert_eq!(gets_before, 1);

    let updated = client
        .activate_consent("consent-1", Some("0xanchor".into()))
        .await
        .unwrap();
    assert_eq!(updated.status, ConsentStatus::Active);
    assert_eq!(updated.blockchain_tx_hash.as_deref(), Some("0xanchor"));

    let after = listing.fetch().await;
    let consents = after.data.unwrap();
    assert_eq!(consents[0].status, ConsentStatus::Active);
    assert_eq!(count_gets(&server).await, 2);
}

#[tokio::test]
async fn failed_mutation_leaves_cached_listing_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/consents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(consent_body("pending", None)))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/consents/consent-1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "error": "Consent already revoked" })),
        )
        .mount(&server)
        .await;

    let client = query_client(&server).await;
    let listing = client.consents(None, None);
    listing.fetch().await;

    let error = client.activate_consent("consent-1", None).await.unwrap_err();
    assert_eq!(error.status(), Some(409));

    // The cached listing is still fresh; no refetch happened.
    listing.fetch().await;
    assert_eq!(count_gets(&server).await, 1);
}

#[tokio::test]
async fn typed_patient_page_decodes_through_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "patients": [{
                "id": "1",
                "patientId": "patient-001",
                "name": "Ada Lovelace",
                "walletAddress": "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb1"
            }],
            "pagination": { "page": 1, "totalPages": 1, "total": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = query_client(&server).await;
    let handle = client.patients(1, 10, Some("ada"));

    let result = handle.fetch().await;
    assert!(!result.is_error);
    let page = result.data.unwrap();
    assert_eq!(page.patients[0].name, "Ada Lovelace");

    // Same params, same entry: the second handle reads the cached page.
    let again = client.patients(1, 10, Some("ada")).fetch().await;
    assert_eq!(again.data.unwrap().pagination.total, 1);
}

#[tokio::test]
async fn server_error_surfaces_without_data_on_first_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "error": "maintenance window" })),
        )
        .mount(&server)
        .await;

    let client = query_client(&server).await;
    let result = client.stats().fetch().await;
    assert!(result.is_error);
    assert!(result.data.is_none());
    assert_eq!(result.error.and_then(|e| e.status()), Some(503));
}

async fn count_gets(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}
