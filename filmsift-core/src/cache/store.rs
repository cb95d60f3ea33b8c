//! Durable JSON cache of provider answers
//!
//! The whole file is loaded and migrated once at `open`. Readers share an
//! `RwLock`; disk writes are serialized by a separate mutex and always go
//! through a temporary file in the cache directory followed by a rename, so
//! a crash never leaves a half-written cache behind.

use super::entry::{CacheEntry, CacheKey};
use super::migration::{canonical_key, migrate_entry};
use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// When `put` reaches the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Every `put` rewrites the file
    #[default]
    WriteThrough,
    /// `put` only marks the store dirty; `flush` persists
    Deferred,
}

/// Cached ratings in ascending order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatingSummary {
    sorted: Vec<f64>,
}

impl RatingSummary {
    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(self.sorted.iter().sum::<f64>() / self.sorted.len() as f64)
    }

    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }
}

pub struct CacheStore {
    path: PathBuf,
    mode: WriteMode,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    write_lock: Mutex<()>,
    dirty: AtomicBool,
}

impl CacheStore {
    /// Load the cache file at `path`
    ///
    /// Never fails: a missing file yields an empty store, and a corrupt one
    /// is renamed to `*.broken.json` before starting empty.
    pub fn open(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        let path = path.into();
        let (entries, dirty) = load_entries(&path);

        info!(
            path = %path.display(),
            entries = entries.len(),
            migrated = dirty,
            "Cache loaded"
        );

        Self {
            path,
            mode,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
            dirty: AtomicBool::new(dirty),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// True when in-memory state differs from the file
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Insert or replace an entry (last write wins)
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) -> CacheResult<()> {
        debug!(key = %key, found = entry.found, "Cache put");
        self.entries.write().await.insert(key, entry);
        self.dirty.store(true, Ordering::Release);

        match self.mode {
            WriteMode::WriteThrough => self.flush().await,
            WriteMode::Deferred => Ok(()),
        }
    }

    /// Persist dirty state atomically; a clean store is left untouched
    pub async fn flush(&self) -> CacheResult<()> {
        let _writer = self.write_lock.lock().await;

        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        // Snapshot under the writer lock so the newest state is always last on disk
        let snapshot: BTreeMap<String, CacheEntry> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect();

        let result = serde_json::to_vec_pretty(&snapshot)
            .map_err(CacheError::from)
            .and_then(|bytes| write_atomic(&self.path, &bytes));

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), entries = snapshot.len(), "Cache flushed");
                Ok(())
            }
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                error!(path = %self.path.display(), error = %e, "Cache flush failed");
                Err(e)
            }
        }
    }

    /// Ratings across positive, non-search entries
    pub async fn rating_summary(&self) -> RatingSummary {
        let entries = self.entries.read().await;
        let mut sorted: Vec<f64> = entries
            .iter()
            .filter(|(key, _)| !key.is_search())
            .filter_map(|(_, entry)| entry.record().and_then(|r| r.rating))
            .collect();
        sorted.sort_by(f64::total_cmp);

        RatingSummary { sorted }
    }
}

fn load_entries(path: &Path) -> (HashMap<CacheKey, CacheEntry>, bool) {
    if !path.exists() {
        return (HashMap::new(), false);
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(CacheError::from)
        .and_then(|content| serde_json::from_str::<Value>(&content).map_err(CacheError::from))
        .and_then(|value| match value {
            Value::Object(map) => Ok(map),
            other => Err(CacheError::Corruption(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        });

    let raw = match parsed {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cache file unreadable; starting empty");
            set_aside(path);
            return (HashMap::new(), false);
        }
    };

    let legacy_fetched_at = file_modified(path).unwrap_or_else(Utc::now);
    let mut entries: HashMap<CacheKey, CacheEntry> = HashMap::with_capacity(raw.len());
    let mut dirty = false;

    // Canonical keys take precedence over legacy keys that map onto them
    let (canonical, legacy): (Vec<_>, Vec<_>) = raw
        .iter()
        .partition(|(key, _)| !key.trim_start().starts_with('{'));

    for (raw_key, value) in canonical.into_iter().chain(legacy) {
        let Some(key) = canonical_key(raw_key) else {
            debug!(key = %raw_key, "Dropping unrecognized legacy cache key");
            dirty = true;
            continue;
        };

        let Some(migrated) = migrate_entry(value, legacy_fetched_at) else {
            warn!(key = %raw_key, "Dropping unreadable cache entry");
            dirty = true;
            continue;
        };

        if key.as_str() != raw_key.as_str() || migrated.was_upgraded() {
            dirty = true;
        }

        if entries.contains_key(&key) {
            dirty = true;
            continue;
        }
        entries.insert(key, migrated.entry);
    }

    (entries, dirty)
}

/// Rename a corrupt cache file to `<stem>.broken.json`
fn set_aside(path: &Path) {
    let broken = path.with_extension("broken.json");
    match std::fs::rename(path, &broken) {
        Ok(()) => info!(from = %path.display(), to = %broken.display(), "Corrupt cache set aside"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not set aside corrupt cache"),
    }
}

fn file_modified(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| CacheError::Io(e.error))?;
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
