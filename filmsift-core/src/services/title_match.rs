//! Title normalization, lookup variants and search candidate ranking

use crate::provider::payload::SearchCandidate;
use std::collections::HashSet;

/// Lowercase, punctuation replaced by spaces, whitespace collapsed
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized Levenshtein similarity (0.0-1.0) of the normalized titles
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_title(a), &normalize_title(b))
}

/// Ranked title variants to try against the provider
///
/// In order: as recorded, case-folded without punctuation, subtitle removed,
/// trailing `(year)` removed. Variants that would produce the same lookup
/// are dropped.
pub fn title_variants(title: &str) -> Vec<String> {
    let base = title.trim();
    let candidates = [
        Some(base.to_string()),
        Some(normalize_title(base)),
        strip_subtitle(base),
        strip_trailing_year(base),
    ];

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

/// `"Alien: Covenant"` → `"Alien"`, `"Mission - Impossible"` → `"Mission"`
fn strip_subtitle(title: &str) -> Option<String> {
    let cut = [":", " - ", " – ", " — "]
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()?;
    let head = title[..cut].trim();
    (!head.is_empty()).then(|| head.to_string())
}

/// `"Heat (1995)"` → `"Heat"`
fn strip_trailing_year(title: &str) -> Option<String> {
    let inner = title.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let year = &inner[open + 1..];
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let head = inner[..open].trim();
    (!head.is_empty()).then(|| head.to_string())
}

/// Heuristic score of one search candidate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateScore {
    /// 2.0 exact title, 1.0 containment
    pub title: f64,
    /// 2.0 exact year, 1.0 off by one
    pub year: f64,
    /// 0.1 per query word present in the candidate title
    pub words: f64,
}

impl CandidateScore {
    pub fn total(&self) -> f64 {
        self.title + self.year + self.words
    }
}

pub fn score_candidate(
    query_title: &str,
    query_year: Option<i32>,
    candidate: &SearchCandidate,
) -> CandidateScore {
    let query = query_title.trim().to_lowercase();
    let found = candidate.title.trim().to_lowercase();

    let title = if query == found {
        2.0
    } else if !query.is_empty()
        && !found.is_empty()
        && (query.contains(&found) || found.contains(&query))
    {
        1.0
    } else {
        0.0
    };

    let year = match (query_year, candidate.year) {
        (Some(q), Some(c)) if q == c => 2.0,
        (Some(q), Some(c)) if (q - c).abs() <= 1 => 1.0,
        _ => 0.0,
    };

    let found_words: HashSet<&str> = found.split_whitespace().collect();
    let shared = query
        .split_whitespace()
        .filter(|w| found_words.contains(w))
        .count();

    CandidateScore {
        title,
        year,
        words: shared as f64 * 0.1,
    }
}

/// Highest-scoring acceptable candidate; the earliest wins ties
///
/// A candidate is acceptable when it carries an id, some title evidence,
/// and a total score of at least `min_score`.
pub fn best_candidate<'a>(
    query_title: &str,
    query_year: Option<i32>,
    candidates: &'a [SearchCandidate],
    min_score: f64,
) -> Option<(&'a SearchCandidate, CandidateScore)> {
    candidates
        .iter()
        .filter(|c| c.external_id.is_some())
        .map(|c| (c, score_candidate(query_title, query_year, c)))
        .filter(|(_, s)| s.title > 0.0 && s.total() >= min_score)
        .fold(None::<(&'a SearchCandidate, CandidateScore)>, |best, current| match best {
            Some(b) if b.1.total() >= current.1.total() => Some(b),
            _ => Some(current),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, year: Option<i32>, id: &str) -> SearchCandidate {
        SearchCandidate {
            title: title.to_string(),
            year,
            external_id: Some(id.to_string()),
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  The Matrix: Reloaded!! "), "the matrix reloaded");
        assert_eq!(normalize_title("Amélie"), "amélie");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(title_similarity("The Matrix", "the matrix!"), 1.0);
        assert!(title_similarity("Alien", "Pride and Prejudice") < 0.6);
    }

    #[test]
    fn test_variants_in_order() {
        assert_eq!(
            title_variants("Alien: Covenant (2017)"),
            vec![
                "Alien: Covenant (2017)".to_string(),
                "alien covenant 2017".to_string(),
                "Alien".to_string(),
                "Alien: Covenant".to_string(),
            ]
        );
    }

    #[test]
    fn test_variants_deduplicate() {
        assert_eq!(title_variants("heat"), vec!["heat".to_string()]);
        assert_eq!(title_variants("Heat"), vec!["Heat".to_string()]);
        assert!(title_variants("   ").is_empty());
    }

    #[test]
    fn test_strip_trailing_year_requires_four_digits() {
        assert_eq!(strip_trailing_year("Heat (1995)"), Some("Heat".to_string()));
        assert_eq!(strip_trailing_year("Heat (Director's Cut)"), None);
        assert_eq!(strip_trailing_year("(1995)"), None);
    }

    #[test]
    fn test_candidate_scoring() {
        let exact = score_candidate("Heat", Some(1995), &candidate("Heat", Some(1995), "tt1"));
        assert_eq!(exact.title, 2.0);
        assert_eq!(exact.year, 2.0);
        assert!((exact.total() - 4.1).abs() < 1e-9);

        let near = score_candidate("Heat", Some(1995), &candidate("Heat Wave", Some(1996), "tt2"));
        assert_eq!(near.title, 1.0);
        assert_eq!(near.year, 1.0);

        let unrelated = score_candidate("Heat", Some(1995), &candidate("Cold", Some(1995), "tt3"));
        assert_eq!(unrelated.title, 0.0);
    }

    #[test]
    fn test_best_candidate_prefers_exact_match() {
        let candidates = vec![
            candidate("Heat Wave", Some(1995), "tt2"),
            candidate("Heat", Some(1986), "tt3"),
            candidate("Heat", Some(1995), "tt1"),
        ];
        let (best, score) = best_candidate("Heat", Some(1995), &candidates, 2.0).unwrap();
        assert_eq!(best.external_id.as_deref(), Some("tt1"));
        assert!(score.total() > 4.0);
    }

    #[test]
    fn test_best_candidate_requires_title_evidence() {
        let candidates = vec![candidate("Cold", Some(1995), "tt3")];
        assert!(best_candidate("Heat", Some(1995), &candidates, 2.0).is_none());
    }

    #[test]
    fn test_best_candidate_tie_keeps_first() {
        let candidates = vec![candidate("Heat", None, "tt1"), candidate("Heat", None, "tt2")];
        let (best, _) = best_candidate("Heat", None, &candidates, 2.0).unwrap();
        assert_eq!(best.external_id.as_deref(), Some("tt1"));
    }
}
