//! Error types for remote fetches.

use thiserror::Error;

/// Error raised by the API client and stored in cache entry state.
///
/// The cache fans a single in-flight result out to every waiting reader,
/// so the error must be `Clone`; sources are therefore captured as
/// rendered messages rather than boxed error chains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure with no HTTP response (DNS, connect, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Server-provided error message, or the status canonical reason.
        message: String,
    },

    /// A request was rejected before dispatch, or a response body did not
    /// match the expected shape.
    #[error("validation error: {0}")]
    Validation(String),
}

impl FetchError {
    /// Returns the HTTP status code for [`FetchError::Http`] errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Creates a validation error from any displayable reason.
    pub fn validation(reason: impl std::fmt::Display) -> Self {
        FetchError::Validation(reason.to_string())
    }
}
