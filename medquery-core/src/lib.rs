#![warn(missing_docs)]
//! # medquery-core
//!
//! Core types for the medquery client data layer.
//!
//! This crate provides the foundational abstractions shared by the cache
//! engine (`medquery`), the API client (`medquery-api`) and the typed query
//! layer (`medquery-client`):
//!
//! - **Identify** cached reads ([`QueryKey`], [`Param`])
//! - **Wrap** fetched data with freshness metadata ([`CacheValue`], [`Freshness`])
//! - **Configure** staleness and expiry windows ([`QueryPolicy`])
//! - **Call** the remote data source ([`Fetcher`])
//! - **Report** transport and validation failures ([`FetchError`])

pub mod error;
pub mod fetcher;
pub mod key;
pub mod policy;
pub mod value;

pub use error::FetchError;
pub use fetcher::{FetchResult, Fetcher, FnFetcher, SharedFetcher, fetch_fn};
pub use key::{Param, QueryKey};
pub use policy::QueryPolicy;
pub use value::{CacheValue, Freshness};

/// Erased payload type stored in the cache.
///
/// All endpoint responses are JSON documents; storing the parsed
/// `serde_json::Value` lets one cache hold heterogeneous resources while the
/// typed layer decodes at the edge.
pub type Payload = serde_json::Value;
