//! Rating provider access
//!
//! - `transport`: HTTP seam (`ProviderTransport`, `OmdbTransport`)
//! - `fetcher`: retry budget, pacing and the shared circuit breaker
//! - `payload`: defensive normalization of provider payloads
//! - `query`: request shapes and their cache keys

pub mod fetcher;
pub mod payload;
pub mod query;
pub mod transport;

pub use fetcher::{Breaker, FetcherSettings, RateLimitedFetcher};
pub use query::ProviderQuery;
pub use transport::{OmdbTransport, ProviderTransport, TransportResponse};
