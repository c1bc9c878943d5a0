//! Thin HTTP adapter mapping logical operations onto REST endpoints.
//!
//! Each operation builds a request against the configured base URL, awaits
//! the response, and parses JSON into a typed model. Non-success statuses
//! map to [`FetchError::Http`] carrying the server-provided message. No
//! retries and no caching here; that is the query cache's job.

use medquery_core::FetchError;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{
    Consent, ConsentStatus, ConsentUpdate, ConsentsEnvelope, MedicalRecord, NewConsent, Patient,
    PatientPage, RecordsEnvelope, Stats, Transaction, TransactionsEnvelope,
};

/// Error body shapes the server is known to produce.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the consent API.
///
/// Cloning is cheap: the underlying `reqwest::Client` is a shared
/// connection pool. Transport timeouts belong to that client's
/// configuration, not this layer.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for the given base URL.
    ///
    /// An unparseable URL is a [`FetchError::Validation`].
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest::Client` (custom
    /// timeouts, proxies, TLS settings).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, FetchError> {
        // A trailing slash keeps Url::join from dropping the last path
        // segment of the base.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| FetchError::validation(format!("invalid base url: {e}")))?;
        Ok(ApiClient { http, base_url })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /patients?page&limit&search` — one page of patients.
    ///
    /// An empty `search` is not sent. A page beyond the last returns an
    /// empty list.
    pub async fn patients(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<PatientPage, FetchError> {
        let mut url = self.endpoint("patients")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("search", search);
        }
        self.get(url).await
    }

    /// `GET /patients/{id}` — one patient.
    pub async fn patient(&self, id: &str) -> Result<Patient, FetchError> {
        let id = require(id, "patient id")?;
        self.get(self.endpoint(&format!("patients/{id}"))?).await
    }

    /// `GET /patients/{id}/records` — a patient's medical records.
    pub async fn patient_records(&self, id: &str) -> Result<Vec<MedicalRecord>, FetchError> {
        let id = require(id, "patient id")?;
        let envelope: RecordsEnvelope = self
            .get(self.endpoint(&format!("patients/{id}/records"))?)
            .await?;
        Ok(envelope.records)
    }

    /// `GET /consents?patientId&status` — consents, optionally filtered.
    pub async fn consents(
        &self,
        patient_id: Option<&str>,
        status: Option<ConsentStatus>,
    ) -> Result<Vec<Consent>, FetchError> {
        let mut url = self.endpoint("consents")?;
        if let Some(patient_id) = patient_id.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("patientId", patient_id);
        }
        if let Some(status) = status {
            url.query_pairs_mut().append_pair("status", status.as_str());
        }
        let envelope: ConsentsEnvelope = self.get(url).await?;
        Ok(envelope.consents)
    }

    /// `POST /consents` — creates a signed consent.
    ///
    /// Incomplete payloads are rejected before dispatch.
    pub async fn create_consent(&self, consent: &NewConsent) -> Result<Consent, FetchError> {
        require(&consent.patient_id, "patientId")?;
        require(&consent.purpose, "purpose")?;
        require(&consent.wallet_address, "walletAddress")?;
        require(&consent.signature, "signature")?;
        let url = self.endpoint("consents")?;
        debug!(url = %url, patient_id = %consent.patient_id, "creating consent");
        let response = self
            .http
            .post(url)
            .json(consent)
            .send()
            .await
            .map_err(network)?;
        decode_response(response).await
    }

    /// `PATCH /consents/{id}` — updates a consent's status.
    pub async fn update_consent(
        &self,
        id: &str,
        update: &ConsentUpdate,
    ) -> Result<Consent, FetchError> {
        let id = require(id, "consent id")?;
        let url = self.endpoint(&format!("consents/{id}"))?;
        debug!(url = %url, status = %update.status, "updating consent");
        let response = self
            .http
            .patch(url)
            .json(update)
            .send()
            .await
            .map_err(network)?;
        decode_response(response).await
    }

    /// `GET /transactions?walletAddress&limit` — recorded transactions.
    pub async fn transactions(
        &self,
        wallet_address: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Transaction>, FetchError> {
        let mut url = self.endpoint("transactions")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        if let Some(wallet) = wallet_address.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("walletAddress", wallet);
        }
        let envelope: TransactionsEnvelope = self.get(url).await?;
        Ok(envelope.transactions)
    }

    /// `GET /stats` — platform-wide counters.
    pub async fn stats(&self) -> Result<Stats, FetchError> {
        self.get(self.endpoint("stats")?).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::validation(format!("invalid endpoint path {path:?}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!(url = %url, "GET");
        let response = self.http.get(url).send().await.map_err(network)?;
        decode_response(response).await
    }
}

fn network(error: reqwest::Error) -> FetchError {
    FetchError::Network(error.to_string())
}

fn require<'a>(value: &'a str, field: &str) -> Result<&'a str, FetchError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FetchError::validation(format!("{field} is required")))
    } else {
        Ok(trimmed)
    }
}

/// Maps a non-success status to [`FetchError::Http`] (preferring the
/// server's own message) and a malformed success body to
/// [`FetchError::Validation`].
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Http {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    let bytes = response.bytes().await.map_err(network)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::validation(format!("unexpected response shape: {e}")))
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.error.or(parsed.message)
    {
        return message;
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
