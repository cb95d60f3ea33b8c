//! filmsift-core library interface
//!
//! Enrichment cache, provider access and deterministic classification of
//! catalog items. The `filmsift` binary is a thin CLI over
//! [`services::ClassificationPipeline`].

pub mod cache;
pub mod error;
pub mod models;
pub mod provider;
pub mod services;

pub use crate::error::{CacheError, ProviderError};
