//! Response and request models for the consent API.
//!
//! Shapes are validated here, at the client boundary: a response that does
//! not deserialize into these models surfaces as
//! [`FetchError::Validation`](medquery_core::FetchError::Validation) instead
//! of flowing unchecked into views. Optional fields default so partially
//! populated records from older server versions still parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Server-side row identifier.
    pub id: String,
    /// Human-facing patient identifier (e.g. `patient-001`).
    pub patient_id: String,
    /// Full name.
    pub name: String,
    /// Contact email, if on file.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone, if on file.
    #[serde(default)]
    pub phone: Option<String>,
    /// Date of birth as an ISO date string.
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Self-reported gender.
    #[serde(default)]
    pub gender: Option<String>,
    /// Wallet address bound to this patient, if any.
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Pagination metadata returned with patient listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page that was served.
    pub page: u32,
    /// Total number of pages for the current filter.
    pub total_pages: u32,
    /// Total number of matching patients.
    pub total: u64,
}

/// One page of patients. A page beyond `total_pages` is an empty list, not
/// an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPage {
    /// Patients on this page.
    #[serde(default)]
    pub patients: Vec<Patient>,
    /// Paging metadata.
    pub pagination: Pagination,
}

/// A medical record attached to a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    /// Server-side row identifier.
    pub id: String,
    /// Record category (diagnostic, treatment, lab, ...).
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    /// Short title.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Treating provider.
    #[serde(default)]
    pub provider: Option<String>,
    /// When the record was taken.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordsEnvelope {
    #[serde(default)]
    pub(crate) records: Vec<MedicalRecord>,
}

/// Lifecycle status of a consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    /// Created and signed, awaiting activation.
    #[default]
    Pending,
    /// Activated and currently in force.
    Active,
    /// Withdrawn by the patient.
    Revoked,
}

impl ConsentStatus {
    /// Query-string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Active => "active",
            ConsentStatus::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consent statement signed with a patient's wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    /// Server-side row identifier.
    pub id: String,
    /// Patient the consent belongs to.
    pub patient_id: String,
    /// What the patient consented to.
    pub purpose: String,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: ConsentStatus,
    /// Wallet that signed the consent statement.
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// Signature over the consent statement.
    #[serde(default)]
    pub signature: Option<String>,
    /// On-chain transaction hash recorded at activation, if any.
    #[serde(default)]
    pub blockchain_tx_hash: Option<String>,
    /// When the consent was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsentsEnvelope {
    #[serde(default)]
    pub(crate) consents: Vec<Consent>,
}

/// Payload for creating a consent. All fields are required; the client
/// rejects incomplete payloads before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsent {
    /// Patient the consent is for.
    pub patient_id: String,
    /// What is being consented to.
    pub purpose: String,
    /// Wallet that signed the statement.
    pub wallet_address: String,
    /// Signature produced by the wallet.
    pub signature: String,
}

/// Partial update applied to an existing consent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentUpdate {
    /// New lifecycle status.
    pub status: ConsentStatus,
    /// Transaction hash from the chain integration, when activation has
    /// been anchored on-chain. Omitted from the request when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
}

impl ConsentUpdate {
    /// Update that activates a consent.
    ///
    /// The transaction hash comes from the external chain integration;
    /// activation without one simply omits the field.
    pub fn activate(blockchain_tx_hash: Option<String>) -> Self {
        ConsentUpdate {
            status: ConsentStatus::Active,
            blockchain_tx_hash,
        }
    }

    /// Update that revokes a consent.
    pub fn revoke() -> Self {
        ConsentUpdate {
            status: ConsentStatus::Revoked,
            blockchain_tx_hash: None,
        }
    }
}

/// A recorded blockchain transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-side row identifier.
    pub id: String,
    /// Transaction category (consent approval, data access, ...).
    #[serde(rename = "type", default)]
    pub transaction_type: Option<String>,
    /// On-chain transaction hash.
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Wallet that initiated the transaction.
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// When the transaction was recorded.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsEnvelope {
    #[serde(default)]
    pub(crate) transactions: Vec<Transaction>,
}

/// Platform-wide counters for the statistics dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Registered patients.
    #[serde(default)]
    pub total_patients: u64,
    /// Stored medical records.
    #[serde(default)]
    pub total_records: u64,
    /// All consent records.
    #[serde(default)]
    pub total_consents: u64,
    /// Consents currently in force.
    #[serde(default)]
    pub active_consents: u64,
    /// Consents awaiting activation.
    #[serde(default)]
    pub pending_consents: u64,
    /// Recorded blockchain transactions.
    #[serde(default)]
    pub total_transactions: u64,
}
