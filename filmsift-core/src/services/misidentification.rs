//! Heuristic detection of items matched to the wrong provider title
//!
//! Advisory only: hints are attached to the row and never change the
//! decision.

use super::title_match::{normalize_title, title_similarity};
use crate::models::{ExternalRecord, MediaItem, MisidentificationHint};
use filmsift_common::config::MisidentificationThresholds;
use tracing::debug;

/// Values compared by the detector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionInputs<'a> {
    pub local_title: Option<&'a str>,
    pub local_year: Option<i32>,
    pub resolved_title: Option<&'a str>,
    pub resolved_year: Option<i32>,
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub secondary_score: Option<u32>,
}

impl<'a> DetectionInputs<'a> {
    pub fn from_row(item: &'a MediaItem, record: &'a ExternalRecord) -> Self {
        Self {
            local_title: Some(item.title.as_str()),
            local_year: item.year,
            resolved_title: record.title.as_deref(),
            resolved_year: record.year,
            rating: record.rating,
            votes: record.votes,
            secondary_score: record.secondary_score,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MisidentificationDetector {
    thresholds: MisidentificationThresholds,
}

impl MisidentificationDetector {
    pub fn new(thresholds: MisidentificationThresholds) -> Self {
        Self { thresholds }
    }

    /// Accumulate every suspicious signal; `None` when there is none
    pub fn detect(&self, inputs: &DetectionInputs<'_>) -> Option<MisidentificationHint> {
        let t = &self.thresholds;
        let mut reasons = Vec::new();

        if let (Some(local), Some(resolved)) = (inputs.local_title, inputs.resolved_title) {
            let a = normalize_title(local);
            let b = normalize_title(resolved);
            if !a.is_empty() && !b.is_empty() && a != b && !a.contains(&b) && !b.contains(&a) {
                let similarity = title_similarity(local, resolved);
                debug!(local, resolved, similarity, "Title similarity");
                if similarity < t.title_similarity_min {
                    reasons.push(format!(
                        "Title mismatch: local '{}' vs provider '{}' (similarity {:.2})",
                        local, resolved, similarity
                    ));
                }
            }
        }

        if let (Some(local), Some(resolved)) = (inputs.local_year, inputs.resolved_year) {
            if (local - resolved).abs() > t.max_year_delta {
                reasons.push(format!(
                    "Year mismatch: local {} vs provider {}",
                    local, resolved
                ));
            }
        }

        let votes = inputs.votes.unwrap_or(0);
        let well_known = votes >= t.known_min_votes;

        if let Some(rating) = inputs.rating {
            if rating <= t.low_rating && well_known {
                reasons.push(format!(
                    "Very low rating ({:.1} <= {}) for a title with {} votes",
                    rating, t.low_rating, votes
                ));
            }
        }

        if let Some(secondary) = inputs.secondary_score {
            if secondary <= t.secondary_floor && well_known {
                reasons.push(format!(
                    "Very low secondary score ({}% <= {}%) for a title with {} votes",
                    secondary, t.secondary_floor, votes
                ));
            }
        }

        (!reasons.is_empty()).then_some(MisidentificationHint { reasons })
    }
}
