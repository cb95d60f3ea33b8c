//! Deterministic classification rules
//!
//! The rule table is ordered; the first rule whose predicate holds decides.
//! Every predicate returns the reason text on success so the explanation
//! always names the comparison that fired. `FALLBACK` matches anything, so
//! scoring is total.

use crate::models::{Decision, RuleTag, ScoreInputs, ScoreResult};
use filmsift_common::config::ScoringThresholds;

type Predicate = fn(&ScoreInputs, &ScoringThresholds) -> Option<String>;

struct Rule {
    tag: RuleTag,
    decision: Decision,
    predicate: Predicate,
}

const RULES: &[Rule] = &[
    Rule {
        tag: RuleTag::NoData,
        decision: Decision::Unknown,
        predicate: no_data,
    },
    Rule {
        tag: RuleTag::KeepRatingVotes,
        decision: Decision::Keep,
        predicate: keep_rating_votes,
    },
    Rule {
        tag: RuleTag::KeepRatingSecondary,
        decision: Decision::Keep,
        predicate: keep_rating_secondary,
    },
    Rule {
        tag: RuleTag::DeleteBayes,
        decision: Decision::Delete,
        predicate: delete_bayes,
    },
    Rule {
        tag: RuleTag::DeleteLowRatingHighVotes,
        decision: Decision::Delete,
        predicate: delete_low_rating_high_votes,
    },
    Rule {
        tag: RuleTag::DeleteRatingVotes,
        decision: Decision::Delete,
        predicate: delete_rating_votes,
    },
    Rule {
        tag: RuleTag::DeleteRatingNoSecondary,
        decision: Decision::Delete,
        predicate: delete_rating_no_secondary,
    },
    Rule {
        tag: RuleTag::Fallback,
        decision: Decision::Maybe,
        predicate: fallback,
    },
];

/// Stateless scorer over the rule table
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Classify one set of inputs
    ///
    /// `thresholds` should already be resolved for the item's year
    /// (see [`ScoringThresholds::for_year`]).
    pub fn score(inputs: ScoreInputs, thresholds: &ScoringThresholds) -> ScoreResult {
        for rule in RULES {
            if let Some(reason) = (rule.predicate)(&inputs, thresholds) {
                return ScoreResult {
                    decision: rule.decision,
                    rule: rule.tag,
                    inputs,
                    reason,
                };
            }
        }

        // FALLBACK always matches; kept for totality if the table changes
        ScoreResult {
            decision: Decision::Maybe,
            rule: RuleTag::Fallback,
            inputs,
            reason: "no rule matched".to_string(),
        }
    }

    /// Convenience wrapper over [`ScoringEngine::score`] for yearless inputs
    pub fn score_values(
        rating: Option<f64>,
        votes: Option<u64>,
        secondary_score: Option<u32>,
        thresholds: &ScoringThresholds,
    ) -> ScoreResult {
        Self::score(
            ScoreInputs {
                rating,
                votes,
                secondary_score,
                year: None,
            },
            thresholds,
        )
    }
}

/// Bayesian average `v/(v+m)·R + m/(v+m)·C`; `None` when `v + m == 0`
pub fn bayes_score(rating: f64, votes: u64, min_votes: u64, global_mean: f64) -> Option<f64> {
    let v = votes as f64;
    let m = min_votes as f64;
    if v + m <= 0.0 {
        return None;
    }
    Some((v / (v + m)) * rating + (m / (v + m)) * global_mean)
}

/// Value at fraction `p` (clamped to 0.0-1.0) of an ascending slice
///
/// Index is `floor(p * (n - 1))`, so `p = 0` is the minimum and `p = 1` the
/// maximum. `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let index = ((p * last as f64) as usize).min(last);
    sorted.get(index).copied()
}

fn no_data(inputs: &ScoreInputs, _: &ScoringThresholds) -> Option<String> {
    inputs
        .rating
        .is_none()
        .then(|| "no rating available from the provider".to_string())
}

fn keep_rating_votes(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let rating = inputs.rating?;
    let votes = inputs.votes?;
    (rating >= t.keep_min_rating && votes >= t.keep_min_votes).then(|| {
        format!(
            "rating {} >= {} and votes {} >= {}",
            rating, t.keep_min_rating, votes, t.keep_min_votes
        )
    })
}

fn keep_rating_secondary(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let rating = inputs.rating?;
    let secondary = inputs.secondary_score?;
    (rating >= t.keep_min_rating_with_secondary && secondary >= t.secondary_keep_min).then(|| {
        format!(
            "rating {} >= {} and secondary score {}% >= {}%",
            rating, t.keep_min_rating_with_secondary, secondary, t.secondary_keep_min
        )
    })
}

fn delete_bayes(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let max_score = t.bayes_delete_max_score?;
    let rating = inputs.rating?;
    let votes = inputs.votes?;
    let score = bayes_score(rating, votes, t.keep_min_votes, t.bayes_global_mean)?;
    (score <= max_score).then(|| {
        format!(
            "bayesian score {:.2} <= {} (R={}, v={}, m={}, C={:.2})",
            score, max_score, rating, votes, t.keep_min_votes, t.bayes_global_mean
        )
    })
}

/// Widely seen and still poorly rated
fn delete_low_rating_high_votes(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let rating = inputs.rating?;
    let votes = inputs.votes?;
    (t.keep_min_votes > 0 && rating <= t.delete_max_rating && votes >= t.keep_min_votes).then(|| {
        format!(
            "rating {} <= {} despite votes {} >= {}",
            rating, t.delete_max_rating, votes, t.keep_min_votes
        )
    })
}

fn delete_rating_votes(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let rating = inputs.rating?;
    let votes = inputs.votes?;
    (rating <= t.delete_max_rating && votes <= t.delete_max_votes).then(|| {
        format!(
            "rating {} <= {} and votes {} <= {}",
            rating, t.delete_max_rating, votes, t.delete_max_votes
        )
    })
}

fn delete_rating_no_secondary(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    let rating = inputs.rating?;
    let votes = inputs.votes?;
    (inputs.secondary_score.is_none()
        && rating <= t.delete_max_rating
        && votes <= t.delete_max_votes_no_secondary)
        .then(|| {
            format!(
                "rating {} <= {} without secondary score and votes {} <= {}",
                rating, t.delete_max_rating, votes, t.delete_max_votes_no_secondary
            )
        })
}

fn fallback(inputs: &ScoreInputs, t: &ScoringThresholds) -> Option<String> {
    Some(format!(
        "neither keep nor delete thresholds met \
         (rating {}, votes {}, secondary {}; keep >= {}, delete <= {})",
        display(inputs.rating),
        display(inputs.votes),
        display(inputs.secondary_score),
        t.keep_min_rating,
        t.delete_max_rating
    ))
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}
