//! Presentation order for classified rows

use crate::models::ClassificationRow;
use std::cmp::Ordering;

/// Stable "worst first" ordering
///
/// Decision rank ascending (DELETE, MAYBE, KEEP, UNKNOWN), then votes,
/// rating and file size descending. Missing numbers count as zero; equal
/// rows keep their input order.
pub struct ResultSorter;

impl ResultSorter {
    pub fn sort(rows: &mut [ClassificationRow]) {
        rows.sort_by(Self::compare);
    }

    pub fn sorted(mut rows: Vec<ClassificationRow>) -> Vec<ClassificationRow> {
        Self::sort(&mut rows);
        rows
    }

    pub fn compare(a: &ClassificationRow, b: &ClassificationRow) -> Ordering {
        a.decision()
            .priority_rank()
            .cmp(&b.decision().priority_rank())
            .then_with(|| votes(b).cmp(&votes(a)))
            .then_with(|| rating(b).total_cmp(&rating(a)))
            .then_with(|| size(b).cmp(&size(a)))
    }
}

fn votes(row: &ClassificationRow) -> u64 {
    row.record.as_ref().and_then(|r| r.votes).unwrap_or(0)
}

fn rating(row: &ClassificationRow) -> f64 {
    row.record
        .as_ref()
        .and_then(|r| r.rating)
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

fn size(row: &ClassificationRow) -> u64 {
    row.item.file_size.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Decision, ExternalRecord, IdentifierSource, MediaItem, RuleTag, ScoreInputs, ScoreResult,
    };

    fn row(
        title: &str,
        decision: Decision,
        votes: Option<u64>,
        rating: Option<f64>,
        size: Option<u64>,
    ) -> ClassificationRow {
        ClassificationRow {
            item: MediaItem {
                title: title.to_string(),
                year: None,
                library: String::new(),
                file_path: String::new(),
                file_size: size,
                identifier: IdentifierSource::Absent,
                local_rating: None,
            },
            record: Some(ExternalRecord {
                votes,
                rating,
                ..Default::default()
            }),
            score: ScoreResult {
                decision,
                rule: RuleTag::Fallback,
                inputs: ScoreInputs::default(),
                reason: String::new(),
            },
            misidentification: None,
            metadata_suggestion: None,
        }
    }

    fn titles(rows: &[ClassificationRow]) -> Vec<&str> {
        rows.iter().map(|r| r.item.title.as_str()).collect()
    }

    #[test]
    fn test_decision_rank_first() {
        let rows = ResultSorter::sorted(vec![
            row("unknown", Decision::Unknown, Some(9), None, None),
            row("keep", Decision::Keep, Some(1), None, None),
            row("maybe", Decision::Maybe, None, None, None),
            row("delete", Decision::Delete, None, None, None),
        ]);
        assert_eq!(titles(&rows), vec!["delete", "maybe", "keep", "unknown"]);
    }

    #[test]
    fn test_numeric_tiebreaks_descending() {
        let rows = ResultSorter::sorted(vec![
            row("few votes", Decision::Keep, Some(10), Some(9.0), Some(5)),
            row("small", Decision::Keep, Some(100), Some(8.0), Some(1)),
            row("big", Decision::Keep, Some(100), Some(8.0), Some(9)),
            row("better", Decision::Keep, Some(100), Some(8.5), None),
        ]);
        assert_eq!(titles(&rows), vec!["better", "big", "small", "few votes"]);
    }

    #[test]
    fn test_missing_numbers_sort_as_zero() {
        let rows = ResultSorter::sorted(vec![
            row("missing", Decision::Maybe, None, None, None),
            row("one", Decision::Maybe, Some(1), None, None),
        ]);
        assert_eq!(titles(&rows), vec!["one", "missing"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = ResultSorter::sorted(vec![
            row("a", Decision::Delete, Some(5), Some(3.0), Some(7)),
            row("b", Decision::Delete, Some(5), Some(3.0), Some(7)),
            row("c", Decision::Delete, Some(5), Some(3.0), Some(7)),
        ]);
        assert_eq!(titles(&rows), vec!["a", "b", "c"]);

        let again = ResultSorter::sorted(rows.clone());
        assert_eq!(again, rows);
    }
}
