//! Test helper utilities
//!
//! Shared utilities for testing filmsift-core

#![allow(dead_code)]

pub mod log_capture;
pub mod mock_transport;

pub use log_capture::{capture_logs, LogCapture};
pub use mock_transport::{
    fast_settings, has_param, movie, not_found, rate_limited, search_results, MockTransport, Reply,
};

use filmsift_core::cache::{CacheStore, WriteMode};
use filmsift_core::models::{IdentifierSource, MediaItem};
use std::path::Path;
use std::sync::Arc;

/// Cache in `dir` using write-through persistence
pub fn open_cache(dir: &Path) -> Arc<CacheStore> {
    Arc::new(CacheStore::open(dir.join("omdb_cache.json"), WriteMode::WriteThrough))
}

pub fn item(title: &str, year: Option<i32>, id: Option<&str>) -> MediaItem {
    MediaItem {
        title: title.to_string(),
        year,
        library: "Movies".to_string(),
        file_path: format!("/media/{}.mkv", title),
        file_size: Some(1_000_000),
        identifier: match id {
            Some(id) => IdentifierSource::Direct { id: id.to_string() },
            None => IdentifierSource::Absent,
        },
        local_rating: None,
    }
}
