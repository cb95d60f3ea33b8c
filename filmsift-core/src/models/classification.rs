//! Classification output types

use super::{ExternalRecord, MediaItem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision category for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Keep,
    Delete,
    Maybe,
    Unknown,
}

impl Decision {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Keep => "KEEP",
            Decision::Delete => "DELETE",
            Decision::Maybe => "MAYBE",
            Decision::Unknown => "UNKNOWN",
        }
    }

    /// Presentation rank, "worst first"
    pub fn priority_rank(&self) -> u8 {
        match self {
            Decision::Delete => 0,
            Decision::Maybe => 1,
            Decision::Keep => 2,
            Decision::Unknown => 3,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the scoring rule that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleTag {
    NoData,
    KeepRatingVotes,
    KeepRatingSecondary,
    DeleteBayes,
    DeleteLowRatingHighVotes,
    DeleteRatingVotes,
    DeleteRatingNoSecondary,
    Fallback,
}

impl RuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::NoData => "NO_DATA",
            RuleTag::KeepRatingVotes => "KEEP_RATING_VOTES",
            RuleTag::KeepRatingSecondary => "KEEP_RATING_SECONDARY",
            RuleTag::DeleteBayes => "DELETE_BAYES",
            RuleTag::DeleteLowRatingHighVotes => "DELETE_LOW_RATING_HIGH_VOTES",
            RuleTag::DeleteRatingVotes => "DELETE_RATING_VOTES",
            RuleTag::DeleteRatingNoSecondary => "DELETE_RATING_NO_SECONDARY",
            RuleTag::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric inputs a decision was computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreInputs {
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub secondary_score: Option<u32>,
    /// Year the vote thresholds were resolved for
    #[serde(default)]
    pub year: Option<i32>,
}

/// Scoring outcome with audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub decision: Decision,
    pub rule: RuleTag,
    pub inputs: ScoreInputs,
    pub reason: String,
}

/// Advisory list of reasons the resolved record may be the wrong title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisidentificationHint {
    pub reasons: Vec<String>,
}

impl fmt::Display for MisidentificationHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reasons.join(" | "))
    }
}

/// Which catalog fields disagree with the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    FixTitle,
    FixYear,
    FixTitleAndYear,
}

impl SuggestionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionAction::FixTitle => "Fix title",
            SuggestionAction::FixYear => "Fix year",
            SuggestionAction::FixTitleAndYear => "Fix title & year",
        }
    }
}

/// Suggested catalog metadata correction (never applied by this crate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSuggestion {
    pub action: SuggestionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_year: Option<i32>,
}

/// Terminal output entity handed to reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub item: MediaItem,
    pub record: Option<ExternalRecord>,
    pub score: ScoreResult,
    #[serde(default)]
    pub misidentification: Option<MisidentificationHint>,
    #[serde(default)]
    pub metadata_suggestion: Option<MetadataSuggestion>,
}

impl ClassificationRow {
    pub fn decision(&self) -> Decision {
        self.score.decision
    }
}
