//! Error types for filmsift-core
//!
//! Provider failures never escape the enrichment layer: they are logged and
//! absorbed into "no external data". Cache failures surface only from
//! `open`/`flush` and callers decide whether they are fatal.

use thiserror::Error;

/// Outcome of a failed provider fetch
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// Timeout, connection failure or 5xx; retried with backoff
    #[error("Transient network failure: {0}")]
    TransientNetwork(String),

    /// Provider reported its request limit
    #[error("Provider rate limit reached")]
    RateLimited,

    /// Circuit breaker is open; no I/O was attempted
    #[error("Provider disabled for the rest of the run")]
    Disabled,

    /// Payload could not be interpreted
    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    /// No API key configured
    #[error("Provider API key not configured")]
    MissingApiKey,
}

impl ProviderError {
    /// True when the provider cannot be consulted at all (cache-only mode)
    ///
    /// These are expected states rather than lookup failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderError::Disabled | ProviderError::MissingApiKey | ProviderError::RateLimited
        )
    }
}

/// Cache persistence failure
#[derive(Debug, Error)]
pub enum CacheError {
    /// File system failure reading or writing the cache
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file content is not a JSON object
    #[error("Cache corruption: {0}")]
    Corruption(String),

    /// Serialization of the in-memory map failed
    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
