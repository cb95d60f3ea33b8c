//! Normalized provider record

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rating data resolved from the provider, normalized to plain types
///
/// Every numeric field is nullable: the provider routinely omits values or
/// reports them as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExternalRecord {
    /// Provider id of the resolved title
    #[serde(default)]
    pub external_id: Option<String>,

    /// Normalized rating (0.0-10.0)
    #[serde(default)]
    pub rating: Option<f64>,

    /// Number of votes behind `rating`
    #[serde(default)]
    pub votes: Option<u64>,

    /// Secondary critic score as an integer percentage
    #[serde(default)]
    pub secondary_score: Option<u32>,

    /// Critic aggregate (0-100), kept for audit
    #[serde(default)]
    pub metascore: Option<u32>,

    /// Title as the provider knows it
    #[serde(default)]
    pub title: Option<String>,

    /// Release year as the provider knows it
    #[serde(default)]
    pub year: Option<i32>,

    /// Untouched provider payload
    #[serde(default)]
    pub raw_payload: Option<Value>,
}

impl ExternalRecord {
    /// True when at least one scoring signal is present
    pub fn has_ratings(&self) -> bool {
        self.rating.is_some() || self.votes.is_some() || self.secondary_score.is_some()
    }
}
