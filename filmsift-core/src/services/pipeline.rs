//! Classification pipeline
//!
//! Drives each catalog item through enrichment, scoring, misidentification
//! and metadata checks with bounded concurrency, then orders the rows.
//! Every item yields a row: an item with no external data is classified
//! `UNKNOWN` by the `NO_DATA` rule.

use super::enrichment::{EnrichmentService, EnrichmentSettings};
use super::metadata_suggester::MetadataSuggester;
use super::misidentification::{DetectionInputs, MisidentificationDetector};
use super::scoring::{percentile, ScoringEngine};
use super::sorter::ResultSorter;
use crate::cache::CacheStore;
use crate::models::{ClassificationRow, Decision, MediaItem, ScoreInputs};
use crate::provider::RateLimitedFetcher;
use filmsift_common::config::{ScoringThresholds, TomlConfig};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ClassificationPipeline {
    enrichment: EnrichmentService,
    thresholds: ScoringThresholds,
    detector: MisidentificationDetector,
    concurrency: usize,
}

impl ClassificationPipeline {
    pub fn new(
        enrichment: EnrichmentService,
        thresholds: ScoringThresholds,
        detector: MisidentificationDetector,
        concurrency: usize,
    ) -> Self {
        Self {
            enrichment,
            thresholds,
            detector,
            concurrency: concurrency.max(1),
        }
    }

    /// Wire the pipeline from loaded configuration
    pub fn from_config(
        config: &TomlConfig,
        cache: Arc<CacheStore>,
        fetcher: Arc<RateLimitedFetcher>,
    ) -> Self {
        let settings = EnrichmentSettings::from_config(&config.provider);
        let enrichment = EnrichmentService::new(cache, fetcher, settings);
        Self::new(
            enrichment,
            config.thresholds.clone(),
            MisidentificationDetector::new(config.misidentification.clone()),
            config.concurrency,
        )
    }

    pub fn enrichment(&self) -> &EnrichmentService {
        &self.enrichment
    }

    /// Classify every item and return the rows in presentation order
    pub async fn classify_all(&self, items: Vec<MediaItem>) -> Vec<ClassificationRow> {
        let started = Instant::now();
        let total = items.len();
        let thresholds = self.thresholds_for_run().await;

        info!(items = total, concurrency = self.concurrency, "Classification started");

        let rows: Vec<ClassificationRow> = stream::iter(items)
            .map(|item| self.classify_item(item, &thresholds))
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Err(e) = self.enrichment.cache().flush().await {
            warn!(error = %e, "Final cache flush failed; results are still complete");
        }

        let rows = ResultSorter::sorted(rows);
        log_summary(&rows, started);
        rows
    }

    /// Classify a single item
    pub async fn classify_item(
        &self,
        item: MediaItem,
        thresholds: &ScoringThresholds,
    ) -> ClassificationRow {
        let record = self.enrichment.resolve(&item).await;

        let year = item.year.or_else(|| record.as_ref().and_then(|r| r.year));
        let inputs = record
            .as_ref()
            .map(|r| ScoreInputs {
                rating: r.rating,
                votes: r.votes,
                secondary_score: r.secondary_score,
                year,
            })
            .unwrap_or(ScoreInputs {
                year,
                ..Default::default()
            });

        let score = ScoringEngine::score(inputs, &thresholds.for_year(year));

        let misidentification = record
            .as_ref()
            .and_then(|r| self.detector.detect(&DetectionInputs::from_row(&item, r)));
        let metadata_suggestion = record
            .as_ref()
            .and_then(|r| MetadataSuggester::suggest(&item, r));

        debug!(
            item = %item.describe(),
            decision = %score.decision,
            rule = %score.rule,
            suspicious = misidentification.is_some(),
            "Item classified"
        );

        ClassificationRow {
            item,
            record,
            score,
            misidentification,
            metadata_suggestion,
        }
    }

    /// Thresholds adjusted to the ratings already in the cache
    ///
    /// With enough cached ratings the Bayesian prior becomes the cache mean,
    /// and with more still the keep/delete rating bars become percentiles of
    /// the cached distribution.
    pub async fn thresholds_for_run(&self) -> ScoringThresholds {
        let mut thresholds = self.thresholds.clone();
        let summary = self.enrichment.cache().rating_summary().await;
        let count = summary.count();

        if let Some(mean) = summary.mean() {
            if count >= thresholds.bayes_min_titles_for_global_mean {
                debug!(count, mean, "Using cached rating mean as Bayesian prior");
                thresholds.bayes_global_mean = mean;
            }
        }

        if count >= thresholds.rating_min_titles_for_auto {
            let keep = percentile(summary.sorted(), thresholds.auto_keep_rating_percentile);
            let delete = percentile(summary.sorted(), thresholds.auto_delete_rating_percentile);
            if let (Some(keep), Some(delete)) = (keep, delete) {
                debug!(count, keep, delete, "Using cached rating percentiles as rating thresholds");
                thresholds.keep_min_rating = keep;
                thresholds.delete_max_rating = delete;
            }
        }

        thresholds
    }
}

fn log_summary(rows: &[ClassificationRow], started: Instant) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.decision().as_str()).or_insert(0) += 1;
    }
    let count = |d: Decision| counts.get(d.as_str()).copied().unwrap_or(0);
    let suspicious = rows.iter().filter(|r| r.misidentification.is_some()).count();

    info!(
        total = rows.len(),
        keep = count(Decision::Keep),
        maybe = count(Decision::Maybe),
        delete = count(Decision::Delete),
        unknown = count(Decision::Unknown),
        suspicious,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Classification complete"
    );
}
