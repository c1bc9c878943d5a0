#![warn(missing_docs)]
//! # medquery-api
//!
//! Typed REST client for the healthcare-consent API.
//!
//! This crate is the thin adapter between logical operations
//! (`patients`, `consents`, `stats`, ...) and HTTP requests against a
//! single configured base URL. Responses are validated into the models in
//! [`models`] at this boundary; transport failures, non-success statuses
//! and malformed shapes all surface as
//! [`FetchError`](medquery_core::FetchError).
//!
//! Caching, de-duplication and invalidation live one layer up, in the
//! `medquery` cache engine.

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    Consent, ConsentStatus, ConsentUpdate, MedicalRecord, NewConsent, Pagination, Patient,
    PatientPage, Stats, Transaction,
};
