//! Resolve catalog items to provider records
//!
//! Lookup order:
//! 1. Provider id (when the catalog has one)
//! 2. Title variants, each with the year and then without it
//! 3. Free-text search, best candidate resolved by id
//!
//! Every lookup consults the cache first. The provider is only called on a
//! miss (or on an entry without ratings when `retry_empty_cache` is set) and
//! only while the fetcher is enabled; all provider failures degrade to "no
//! external data".

use super::title_match::{best_candidate, title_similarity, title_variants};
use crate::cache::{CacheEntry, CacheStore};
use crate::error::ProviderError;
use crate::models::{ExternalRecord, MediaItem};
use crate::provider::{payload, ProviderQuery, RateLimitedFetcher};
use chrono::Utc;
use filmsift_common::config::ProviderConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a single cached-or-fetched lookup
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ExternalRecord),
    /// Provider confirmed no match (possibly from a cached negative)
    NotFound,
    /// No cached answer and the provider could not be asked
    Unavailable,
}

impl LookupOutcome {
    fn from_entry(entry: &CacheEntry) -> Self {
        match entry.record() {
            Some(record) => LookupOutcome::Found(record.clone()),
            None => LookupOutcome::NotFound,
        }
    }
}

/// Lookup tuning for [`EnrichmentService`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSettings {
    pub retry_empty_cache: bool,
    pub min_title_similarity: f64,
    pub min_search_score: f64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}

impl EnrichmentSettings {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            retry_empty_cache: config.retry_empty_cache,
            min_title_similarity: config.min_title_similarity,
            min_search_score: config.min_search_score,
        }
    }
}

pub struct EnrichmentService {
    cache: Arc<CacheStore>,
    fetcher: Arc<RateLimitedFetcher>,
    settings: EnrichmentSettings,
}

impl EnrichmentService {
    pub fn new(
        cache: Arc<CacheStore>,
        fetcher: Arc<RateLimitedFetcher>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            cache,
            fetcher,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn fetcher(&self) -> &Arc<RateLimitedFetcher> {
        &self.fetcher
    }

    /// Resolve `item` to a provider record, or `None` when nothing matches
    pub async fn resolve(&self, item: &MediaItem) -> Option<ExternalRecord> {
        if let Some(id) = item.external_id() {
            match self.lookup(ProviderQuery::ById { id: id.clone() }).await {
                LookupOutcome::Found(record) => {
                    debug!(item = %item.describe(), id = %id, "Resolved by id");
                    return Some(record);
                }
                outcome => {
                    debug!(item = %item.describe(), id = %id, ?outcome, "Id lookup yielded nothing")
                }
            }
        }

        if let Some(record) = self.resolve_by_title(item).await {
            return Some(record);
        }

        self.resolve_by_search(item).await
    }

    async fn resolve_by_title(&self, item: &MediaItem) -> Option<ExternalRecord> {
        let years: Vec<Option<i32>> = match item.year {
            Some(year) => vec![Some(year), None],
            None => vec![None],
        };

        for variant in title_variants(&item.title) {
            for year in &years {
                let query = ProviderQuery::ByTitle {
                    title: variant.clone(),
                    year: *year,
                };

                if let LookupOutcome::Found(record) = self.lookup(query).await {
                    if self.accepts(item, &variant, &record) {
                        debug!(
                            item = %item.describe(),
                            variant = %variant,
                            year = ?year,
                            "Resolved by title"
                        );
                        return Some(record);
                    }
                    debug!(
                        item = %item.describe(),
                        variant = %variant,
                        resolved = ?record.title,
                        resolved_year = ?record.year,
                        "Rejected low-confidence title match"
                    );
                }
            }
        }

        None
    }

    async fn resolve_by_search(&self, item: &MediaItem) -> Option<ExternalRecord> {
        let title = item.title.trim();
        if title.is_empty() {
            return None;
        }

        let LookupOutcome::Found(results) = self
            .lookup(ProviderQuery::Search {
                title: title.to_string(),
            })
            .await
        else {
            return None;
        };

        let candidates = results
            .raw_payload
            .as_ref()
            .map(payload::search_candidates)
            .unwrap_or_default();

        let (best, score) =
            best_candidate(title, item.year, &candidates, self.settings.min_search_score)?;
        let id = best.external_id.clone()?;

        debug!(
            item = %item.describe(),
            candidate = %best.title,
            id = %id,
            score = score.total(),
            "Search candidate selected"
        );

        match self.lookup(ProviderQuery::ById { id }).await {
            LookupOutcome::Found(record) => Some(record),
            _ => None,
        }
    }

    /// Confidence check for title lookups: year within ±1 and similar title
    fn accepts(&self, item: &MediaItem, variant: &str, record: &ExternalRecord) -> bool {
        if let (Some(local), Some(resolved)) = (item.year, record.year) {
            if (local - resolved).abs() > 1 {
                return false;
            }
        }

        let Some(resolved_title) = record.title.as_deref() else {
            return true;
        };

        let similarity = title_similarity(&item.title, resolved_title)
            .max(title_similarity(variant, resolved_title));
        similarity >= self.settings.min_title_similarity
    }

    /// Cache-first lookup for one query
    pub async fn lookup(&self, query: ProviderQuery) -> LookupOutcome {
        let key = query.cache_key();
        let cached = self.cache.get(&key).await;

        if let Some(entry) = &cached {
            let refetch =
                self.settings.retry_empty_cache && !query.is_search() && !entry.has_ratings();
            if !refetch || !self.fetcher.is_enabled() {
                return LookupOutcome::from_entry(entry);
            }
            info!(key = %key, "Refetching cached entry without ratings");
        } else if !self.fetcher.is_enabled() {
            return LookupOutcome::Unavailable;
        }

        let fallback = || {
            cached
                .as_ref()
                .map(LookupOutcome::from_entry)
                .unwrap_or(LookupOutcome::Unavailable)
        };

        let payload = match self.fetcher.fetch(&query).await {
            Ok(payload) => payload,
            Err(e) => {
                log_fetch_failure(&query, &e);
                return fallback();
            }
        };

        let (entry, outcome) = if payload::is_success(&payload) {
            let Some(record) = payload::normalize(&payload) else {
                warn!(%query, "Provider payload could not be normalized");
                return fallback();
            };
            (
                CacheEntry::found(record.clone(), Utc::now()),
                LookupOutcome::Found(record),
            )
        } else if payload::is_not_found(&payload) {
            (CacheEntry::not_found(Utc::now()), LookupOutcome::NotFound)
        } else {
            warn!(
                %query,
                error = payload::error_message(&payload).unwrap_or("<none>"),
                "Provider returned an unusable payload"
            );
            return fallback();
        };

        if let Err(e) = self.cache.put(key.clone(), entry).await {
            warn!(key = %key, error = %e, "Failed to persist cache entry");
        }

        outcome
    }
}

fn log_fetch_failure(query: &ProviderQuery, error: &ProviderError) {
    if error.is_unavailable() {
        debug!(%query, error = %error, "Provider unavailable; lookup abandoned");
    } else {
        warn!(%query, error = %error, "Provider lookup failed");
    }
}
