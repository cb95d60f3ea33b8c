//! Read-time migration of cache entries and keys
//!
//! Schema history:
//! - v0: unversioned; either the raw provider payload stored under the key,
//!   or flat normalized fields without a `schema_version`
//! - v1: flat normalized fields plus `schema_version: 1`
//! - v2: `{fields, fetched_at, schema_version: 2, found}`
//!
//! Migration is pure: the caller supplies the timestamp assumed for legacy
//! entries that never recorded one. Fields are read one at a time; a missing
//! or unreadable field becomes `None` without affecting its neighbours. Only
//! a value that is not a JSON object, or an unversioned object of neither
//! known shape, is reported as unreadable.

use super::entry::{CacheEntry, CacheKey, CURRENT_SCHEMA_VERSION};
use crate::models::ExternalRecord;
use crate::provider::payload;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Keys only a raw provider payload carries
const PAYLOAD_KEYS: &[&str] = &[
    "Response",
    "imdbID",
    "Title",
    "imdbRating",
    "imdbVotes",
    "Ratings",
];

/// Keys of the flat normalized layout
const FLAT_KEYS: &[&str] = &[
    "rating",
    "votes",
    "secondary_score",
    "metascore",
    "title",
    "year",
    "external_id",
    "raw_payload",
];

/// Result of migrating one stored value
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub entry: CacheEntry,
    /// Schema version the value was stored with
    pub from_version: u32,
}

impl Migrated {
    pub fn was_upgraded(&self) -> bool {
        self.from_version != CURRENT_SCHEMA_VERSION
    }
}

/// Bring any stored value to the current schema
pub fn migrate_entry(value: &Value, legacy_fetched_at: DateTime<Utc>) -> Option<Migrated> {
    let obj = value.as_object()?;

    let version = obj
        .get("schema_version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    let entry = match version {
        0 => from_v0(value, obj, legacy_fetched_at)?,
        1 => from_flat(obj, legacy_fetched_at),
        _ => from_v2(obj, legacy_fetched_at),
    };

    Some(Migrated {
        entry,
        from_version: version,
    })
}

/// Unversioned entries come in two shapes, told apart by their keys
fn from_v0(
    value: &Value,
    obj: &Map<String, Value>,
    legacy_fetched_at: DateTime<Utc>,
) -> Option<CacheEntry> {
    if has_any(obj, PAYLOAD_KEYS) {
        return if payload::is_success(value) {
            let fields = payload::normalize(value)?;
            Some(CacheEntry::found(fields, legacy_fetched_at))
        } else {
            Some(CacheEntry::not_found(legacy_fetched_at))
        };
    }

    if has_any(obj, FLAT_KEYS) {
        return Some(from_flat(obj, legacy_fetched_at));
    }

    None
}

fn has_any(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| obj.contains_key(*key))
}

fn from_flat(obj: &Map<String, Value>, legacy_fetched_at: DateTime<Utc>) -> CacheEntry {
    let fetched_at = obj
        .get("fetched_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(legacy_fetched_at);
    let found = obj.get("found").and_then(Value::as_bool).unwrap_or(true);

    assemble(record_from_fields(obj), fetched_at, found)
}

fn from_v2(obj: &Map<String, Value>, legacy_fetched_at: DateTime<Utc>) -> CacheEntry {
    let fields = match obj.get("fields") {
        Some(Value::Object(fields)) => record_from_fields(fields),
        _ => ExternalRecord::default(),
    };
    let fetched_at = obj
        .get("fetched_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(legacy_fetched_at);
    let found = obj.get("found").and_then(Value::as_bool).unwrap_or(true);

    assemble(fields, fetched_at, found)
}

/// Normalized record read field by field with the payload coercers
fn record_from_fields(obj: &Map<String, Value>) -> ExternalRecord {
    ExternalRecord {
        external_id: obj
            .get("external_id")
            .and_then(payload::text)
            .map(|id| id.to_ascii_lowercase()),
        rating: obj.get("rating").and_then(payload::parse_rating),
        votes: obj.get("votes").and_then(payload::parse_votes),
        secondary_score: obj.get("secondary_score").and_then(payload::parse_percent),
        metascore: obj.get("metascore").and_then(payload::parse_metascore),
        title: obj
            .get("title")
            .and_then(payload::text)
            .map(str::to_string),
        year: obj.get("year").and_then(payload::parse_year),
        raw_payload: obj.get("raw_payload").filter(|v| !v.is_null()).cloned(),
    }
}

fn assemble(fields: ExternalRecord, fetched_at: DateTime<Utc>, found: bool) -> CacheEntry {
    if found {
        CacheEntry::found(fields, fetched_at)
    } else {
        CacheEntry::not_found(fetched_at)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonical form of a key read from disk
///
/// Legacy keys were the JSON-encoded query parameters, e.g. `{"i": "tt0111161"}`
/// or `{"t": "Heat", "y": "1995"}`. Returns `None` for legacy keys that name
/// neither an id nor a title.
pub fn canonical_key(raw: &str) -> Option<CacheKey> {
    let stripped = raw.trim();
    if !(stripped.starts_with('{') && stripped.ends_with('}')) {
        return Some(CacheKey::from_raw(stripped));
    }

    let params: Map<String, Value> = serde_json::from_str(stripped).ok()?;

    if let Some(id) = params.get("i").and_then(scalar_text) {
        return Some(CacheKey::for_id(&id));
    }

    let title = params.get("t").and_then(scalar_text)?;
    let year = params
        .get("y")
        .and_then(scalar_text)
        .and_then(|y| y.parse::<i32>().ok());
    Some(CacheKey::for_title(&title, year))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
