//! Provider payload normalization
//!
//! The provider reports every field as a string and uses `"N/A"` for absent
//! values. Extraction here is total: anything unexpected becomes `None`.

use crate::models::ExternalRecord;
use serde_json::Value;

const NOT_AVAILABLE: &str = "N/A";
const SECONDARY_SOURCE: &str = "Rotten Tomatoes";

/// Normalize a single-title payload
///
/// Returns `None` when the payload is not a JSON object.
pub fn normalize(payload: &Value) -> Option<ExternalRecord> {
    let obj = payload.as_object()?;

    Some(ExternalRecord {
        external_id: obj
            .get("imdbID")
            .and_then(text)
            .map(|id| id.to_ascii_lowercase()),
        rating: obj.get("imdbRating").and_then(parse_rating),
        votes: obj.get("imdbVotes").and_then(parse_votes),
        secondary_score: parse_secondary_score(payload),
        metascore: obj.get("Metascore").and_then(parse_metascore),
        title: obj.get("Title").and_then(text).map(str::to_string),
        year: obj.get("Year").and_then(parse_year),
        raw_payload: Some(payload.clone()),
    })
}

/// `Response: "True"`
pub fn is_success(payload: &Value) -> bool {
    payload.get("Response").and_then(Value::as_str) == Some("True")
}

/// `Response: "False"` with a "not found" style error
pub fn is_not_found(payload: &Value) -> bool {
    payload.get("Response").and_then(Value::as_str) == Some("False")
        && error_message(payload)
            .map(|msg| msg.to_ascii_lowercase().contains("not found"))
            .unwrap_or(false)
}

/// Provider `Error` field, if any
pub fn error_message(payload: &Value) -> Option<&str> {
    payload.get("Error").and_then(Value::as_str)
}

/// Non-empty string that is not the "N/A" marker
pub(crate) fn text(value: &Value) -> Option<&str> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != NOT_AVAILABLE)
}

/// Rating on the 0-10 scale
pub fn parse_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64()?,
        other => text(other)?.parse::<f64>().ok()?,
    };
    (rating.is_finite() && (0.0..=10.0).contains(&rating)).then_some(rating)
}

/// Vote count, thousands separators removed (`"1,234"` → 1234)
pub fn parse_votes(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        other => text(other)?.replace(',', "").parse::<u64>().ok(),
    }
}

/// Integer 0-100 critic aggregate
pub fn parse_metascore(value: &Value) -> Option<u32> {
    let score = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        other => text(other)?.parse::<u32>().ok(),
    };
    score.filter(|v| *v <= 100)
}

/// Integer percentage, with or without a trailing `%` (`"87%"`, `"87"`, `87`)
pub fn parse_percent(value: &Value) -> Option<u32> {
    let score = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        other => {
            let s = text(other)?;
            s.strip_suffix('%').unwrap_or(s).trim().parse::<u32>().ok()
        }
    };
    score.filter(|v| *v <= 100)
}

/// Year from the first four characters (`"1994–1998"` → 1994)
pub fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        other => {
            let s = text(other)?;
            let head = s.get(..4)?;
            if head.chars().all(|c| c.is_ascii_digit()) {
                head.parse().ok()
            } else {
                None
            }
        }
    }
}

/// `"87%"` under the "Rotten Tomatoes" entry of `Ratings`
pub fn parse_secondary_score(payload: &Value) -> Option<u32> {
    payload
        .get("Ratings")?
        .as_array()?
        .iter()
        .filter(|r| r.get("Source").and_then(Value::as_str) == Some(SECONDARY_SOURCE))
        .find_map(|r| {
            let raw = r.get("Value").and_then(Value::as_str)?.trim();
            raw.strip_suffix('%')?.trim().parse::<u32>().ok()
        })
}

/// One entry of a free-text search result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub title: String,
    pub year: Option<i32>,
    pub external_id: Option<String>,
}

/// Candidates from a `Search` result list; malformed entries are skipped
pub fn search_candidates(payload: &Value) -> Vec<SearchCandidate> {
    let Some(results) = payload.get("Search").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|cand| {
            let title = cand.get("Title").and_then(text)?.to_string();
            Some(SearchCandidate {
                title,
                year: cand.get("Year").and_then(parse_year),
                external_id: cand
                    .get("imdbID")
                    .and_then(text)
                    .map(|id| id.to_ascii_lowercase()),
            })
        })
        .collect()
}
