//! Integration tests for the on-disk cache
//!
//! Round-trips, corruption recovery, legacy migration with canonical
//! rewrite, deferred persistence and concurrent writers.

mod helpers;

use chrono::{TimeZone, Utc};
use filmsift_core::cache::{CacheEntry, CacheKey, CacheStore, WriteMode, CURRENT_SCHEMA_VERSION};
use filmsift_core::models::ExternalRecord;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn record(rating: f64, votes: u64) -> ExternalRecord {
    ExternalRecord {
        external_id: Some("tt0113277".to_string()),
        rating: Some(rating),
        votes: Some(votes),
        secondary_score: Some(88),
        title: Some("Heat".to_string()),
        year: Some(1995),
        ..Default::default()
    }
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_round_trip_through_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cache.json");
    let fetched_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

    let store = CacheStore::open(&path, WriteMode::WriteThrough);
    store
        .put(CacheKey::for_id("tt0113277"), CacheEntry::found(record(8.3, 700_000), fetched_at))
        .await
        .unwrap();
    store
        .put(CacheKey::for_title("Nothing", Some(2001)), CacheEntry::not_found(fetched_at))
        .await
        .unwrap();
    assert!(!store.is_dirty());

    let reopened = CacheStore::open(&path, WriteMode::WriteThrough);
    assert!(!reopened.is_dirty());
    assert_eq!(reopened.len().await, 2);

    let hit = reopened.get(&CacheKey::for_id("tt0113277")).await.unwrap();
    assert_eq!(hit.fields, record(8.3, 700_000));
    assert_eq!(hit.fetched_at, fetched_at);
    assert_eq!(hit.schema_version, CURRENT_SCHEMA_VERSION);

    let negative = reopened.get(&CacheKey::for_title("nothing", Some(2001))).await.unwrap();
    assert!(!negative.found);

    // On-disk layout
    let raw = read_json(&path);
    assert_eq!(raw["tt0113277"]["schema_version"], 2);
    assert_eq!(raw["tt0113277"]["found"], true);
    assert_eq!(raw["tt0113277"]["fields"]["votes"], 700_000);
    assert_eq!(raw["title:2001:nothing"]["found"], false);
}

#[tokio::test]
async fn test_last_write_wins() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cache.json");
    let store = CacheStore::open(&path, WriteMode::WriteThrough);
    let key = CacheKey::for_id("tt0113277");

    store.put(key.clone(), CacheEntry::found(record(5.0, 10), Utc::now())).await.unwrap();
    store.put(key.clone(), CacheEntry::found(record(8.3, 700_000), Utc::now())).await.unwrap();

    let reopened = CacheStore::open(&path, WriteMode::WriteThrough);
    assert_eq!(reopened.get(&key).await.unwrap().fields.rating, Some(8.3));
}

#[tokio::test]
async fn test_corrupt_file_is_set_aside() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("omdb_cache.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = CacheStore::open(&path, WriteMode::WriteThrough);
    assert!(store.is_empty().await);
    assert!(!path.exists());

    let broken = temp.path().join("omdb_cache.broken.json");
    assert_eq!(std::fs::read_to_string(broken).unwrap(), "{ this is not json");

    // The store keeps working
    store
        .put(CacheKey::for_id("tt0113277"), CacheEntry::found(record(8.3, 1), Utc::now()))
        .await
        .unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_non_object_file_is_set_aside() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("omdb_cache.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let store = CacheStore::open(&path, WriteMode::Deferred);
    assert!(store.is_empty().await);
    assert!(temp.path().join("omdb_cache.broken.json").exists());
}

#[tokio::test]
async fn test_missing_file_starts_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/cache.json");
    let store = CacheStore::open(&path, WriteMode::WriteThrough);
    assert!(store.is_empty().await);

    // Parent directories are created on first write
    store
        .put(CacheKey::for_id("tt1"), CacheEntry::not_found(Utc::now()))
        .await
        .unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_legacy_file_is_migrated_and_rewritten() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("omdb_cache.json");

    let legacy = json!({
        "tt0113277": {
            "Title": "Heat", "Year": "1995", "imdbRating": "8.3", "imdbVotes": "700,000",
            "imdbID": "tt0113277", "Response": "True"
        },
        "{\"i\": \"tt0133093\", \"type\": \"movie\"}": {
            "Title": "The Matrix", "Year": "1999", "imdbRating": "8.7", "imdbVotes": "2,000,000",
            "imdbID": "tt0133093", "Response": "True"
        },
        "{\"t\": \"Nothing\", \"y\": \"2001\"}": {"Response": "False", "Error": "Movie not found!"},
        "title::alien": {
            "schema_version": 1, "rating": 8.5, "votes": 900000, "title": "Alien", "year": 1979
        },
        "tt0000404": "garbage"
    });
    std::fs::write(&path, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let store = CacheStore::open(&path, WriteMode::Deferred);
    assert!(store.is_dirty());
    assert_eq!(store.len().await, 4);

    let heat = store.get(&CacheKey::for_id("tt0113277")).await.unwrap();
    assert_eq!(heat.fields.votes, Some(700_000));

    let matrix = store.get(&CacheKey::for_id("tt0133093")).await.unwrap();
    assert_eq!(matrix.fields.rating, Some(8.7));

    let nothing = store.get(&CacheKey::for_title("Nothing", Some(2001))).await.unwrap();
    assert!(!nothing.found);

    let alien = store.get(&CacheKey::for_title("Alien", None)).await.unwrap();
    assert_eq!(alien.fields.votes, Some(900_000));
    assert_eq!(alien.fields.secondary_score, None);

    assert!(store.get(&CacheKey::for_id("tt0000404")).await.is_none());

    store.flush().await.unwrap();

    // Canonical keys and current schema on disk
    let raw = read_json(&path);
    let obj = raw.as_object().unwrap();
    assert_eq!(obj.len(), 4);
    assert!(obj.keys().all(|k| !k.starts_with('{')));
    assert!(obj.values().all(|v| v["schema_version"] == 2));

    let reopened = CacheStore::open(&path, WriteMode::Deferred);
    assert!(!reopened.is_dirty());
    assert_eq!(reopened.len().await, 4);
}

#[tokio::test]
async fn test_unversioned_flat_entries_keep_their_data() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("omdb_cache.json");
    let legacy = json!({
        "tt0113277": {
            "rating": 7.1, "votes": 1200, "secondary_score": 80, "title": "Heat", "year": 1995
        },
        "tt0133093": {"schema_version": 1, "rating": "8.7", "votes": "2,000,000", "year": "n/a"}
    });
    std::fs::write(&path, legacy.to_string()).unwrap();

    let store = CacheStore::open(&path, WriteMode::Deferred);
    assert!(store.is_dirty());
    assert_eq!(store.len().await, 2);

    let heat = store.get(&CacheKey::for_id("tt0113277")).await.unwrap();
    assert!(heat.found);
    assert_eq!(heat.fields.rating, Some(7.1));
    assert_eq!(heat.fields.votes, Some(1200));
    assert_eq!(heat.fields.secondary_score, Some(80));

    // Unreadable year does not cost the readable neighbours
    let matrix = store.get(&CacheKey::for_id("tt0133093")).await.unwrap();
    assert_eq!(matrix.fields.rating, Some(8.7));
    assert_eq!(matrix.fields.votes, Some(2_000_000));
    assert_eq!(matrix.fields.year, None);

    store.flush().await.unwrap();
    let raw = read_json(&path);
    assert_eq!(raw["tt0113277"]["schema_version"], 2);
    assert_eq!(raw["tt0113277"]["found"], true);
    assert_eq!(raw["tt0113277"]["fields"]["rating"], 7.1);
}

#[tokio::test]
async fn test_canonical_key_beats_legacy_duplicate() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("omdb_cache.json");
    let legacy = json!({
        "{\"i\": \"tt0113277\"}": {"Title": "Old", "imdbRating": "1.0", "Response": "True"},
        "tt0113277": {"Title": "Heat", "imdbRating": "8.3", "Response": "True"}
    });
    std::fs::write(&path, legacy.to_string()).unwrap();

    let store = CacheStore::open(&path, WriteMode::Deferred);
    let entry = store.get(&CacheKey::for_id("tt0113277")).await.unwrap();
    assert_eq!(entry.fields.rating, Some(8.3));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_deferred_mode_persists_on_flush_only() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cache.json");
    let store = CacheStore::open(&path, WriteMode::Deferred);

    store
        .put(CacheKey::for_id("tt0113277"), CacheEntry::found(record(8.3, 1), Utc::now()))
        .await
        .unwrap();
    assert!(!path.exists());
    assert!(store.is_dirty());

    store.flush().await.unwrap();
    assert!(path.exists());
    assert!(!store.is_dirty());

    let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
    store.flush().await.unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_lose_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cache.json");
    let store = Arc::new(CacheStore::open(&path, WriteMode::WriteThrough));

    let mut handles = Vec::new();
    for i in 0..32u64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let key = CacheKey::for_id(&format!("tt{:07}", i));
            store
                .put(key, CacheEntry::found(record(5.0 + (i % 5) as f64, i), Utc::now()))
                .await
                .unwrap();
            store.get(&CacheKey::for_id("tt0000000")).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reopened = CacheStore::open(&path, WriteMode::WriteThrough);
    assert_eq!(reopened.len().await, 32);
    for i in 0..32u64 {
        let entry = reopened.get(&CacheKey::for_id(&format!("tt{:07}", i))).await.unwrap();
        assert_eq!(entry.fields.votes, Some(i));
    }

    // No stray temporary files left in the cache directory
    let files: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_rating_summary_ignores_negatives_and_searches() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::open(temp.path().join("cache.json"), WriteMode::Deferred);

    assert_eq!(store.rating_summary().await.count(), 0);
    assert_eq!(store.rating_summary().await.mean(), None);

    for (id, rating) in [("tt1", 6.0), ("tt2", 8.0)] {
        let entry = CacheEntry::found(record(rating, 1), Utc::now());
        store.put(CacheKey::for_id(id), entry).await.unwrap();
    }
    store.put(CacheKey::for_id("tt3"), CacheEntry::not_found(Utc::now())).await.unwrap();
    store
        .put(CacheKey::for_search("heat"), CacheEntry::found(record(1.0, 1), Utc::now()))
        .await
        .unwrap();

    let summary = store.rating_summary().await;
    assert_eq!(summary.count(), 2);
    assert_eq!(summary.mean(), Some(7.0));
    assert_eq!(summary.sorted(), &[6.0, 8.0]);
}
