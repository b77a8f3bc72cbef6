//! Error types for provider access, statement normalization and catalog loading.
//!
//! Metric derivation and formatting never return errors: anything they cannot
//! compute degrades to [`Resolved::Unavailable`](crate::Resolved::Unavailable)
//! or to a plain string. [`KpiError`] only surfaces at the edges, where data
//! is fetched, parsed or configured.

use thiserror::Error;

/// Errors that can occur while fetching, normalizing or configuring data.
#[derive(Error, Debug)]
pub enum KpiError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing a provider payload or a raw statement table.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The metric catalog configuration is invalid.
    #[error("Invalid metric catalog: {0}")]
    Catalog(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested feature is not supported by the provider.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for KpiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<polars::error::PolarsError> for KpiError {
    fn from(e: polars::error::PolarsError) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result type alias using [`KpiError`].
pub type Result<T> = std::result::Result<T, KpiError>;
