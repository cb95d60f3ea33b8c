//! Cache keys and entries

use crate::models::ExternalRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Canonical cache key
///
/// - `tt0111161` for id lookups
/// - `title:1999:the matrix` / `title::the matrix` for title lookups
/// - `search:the matrix` for free-text search result lists
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_id(id: &str) -> Self {
        CacheKey(id.trim().to_ascii_lowercase())
    }

    pub fn for_title(title: &str, year: Option<i32>) -> Self {
        let title = title.trim().to_lowercase();
        match year {
            Some(year) => CacheKey(format!("title:{}:{}", year, title)),
            None => CacheKey(format!("title::{}", title)),
        }
    }

    pub fn for_search(title: &str) -> Self {
        CacheKey(format!("search:{}", title.trim().to_lowercase()))
    }

    /// Wrap a key read from disk that is already canonical
    pub(crate) fn from_raw(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_search(&self) -> bool {
        self.0.starts_with("search:")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cached provider answer (positive or negative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized fields; empty for "not found" entries
    pub fields: ExternalRecord,

    /// When the provider was consulted
    pub fetched_at: DateTime<Utc>,

    pub schema_version: u32,

    /// False marks a confirmed "not found"
    pub found: bool,
}

impl CacheEntry {
    pub fn found(fields: ExternalRecord, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fields,
            fetched_at,
            schema_version: CURRENT_SCHEMA_VERSION,
            found: true,
        }
    }

    pub fn not_found(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fields: ExternalRecord::default(),
            fetched_at,
            schema_version: CURRENT_SCHEMA_VERSION,
            found: false,
        }
    }

    /// True when the entry carries any scoring signal
    pub fn has_ratings(&self) -> bool {
        self.found && self.fields.has_ratings()
    }

    /// Record for a positive entry
    pub fn record(&self) -> Option<&ExternalRecord> {
        self.found.then_some(&self.fields)
    }
}
