//! # Suggestion Ranking
//!
//! Scores each suggestion as the weighted sum of its proposed deltas, nudged
//! by the active scenario, and orders them best first.

use std::cmp::Reverse;

use crate::{ScenarioFlags, Suggestion, Weights};

/// Score adjustment applied by a matching scenario.
pub const SCENARIO_NUDGE: i64 = 10;

/// Score a single suggestion.
///
/// Deltas for weights the user does not have contribute nothing.
#[must_use]
pub fn score(suggestion: &Suggestion, weights: &Weights, flags: ScenarioFlags) -> i64 {
    let mut score = suggestion
        .deltas()
        .map(|(key, delta)| weights.get(key).unwrap_or_default().saturating_mul(delta.value()))
        .fold(0_i64, i64::saturating_add);

    if flags.rain && suggestion.kind == "comfort" {
        score = score.saturating_add(SCENARIO_NUDGE);
    }
    if flags.peak && suggestion.kind == "time" {
        score = score.saturating_add(SCENARIO_NUDGE);
    }
    if flags.train_delay && suggestion.kind.contains("rail") {
        score = score.saturating_sub(SCENARIO_NUDGE);
    }
    score
}

/// Score every suggestion and order by score, highest first. Equal scores
/// keep their input order.
#[must_use]
pub fn rank(suggestions: &[Suggestion], weights: &Weights, flags: ScenarioFlags) -> Vec<Suggestion> {
    let mut ranked = suggestions
        .iter()
        .map(|suggestion| Suggestion {
            score: Some(score(suggestion, weights, flags)),
            ..suggestion.clone()
        })
        .collect::<Vec<_>>();

    ranked.sort_by_key(|suggestion| Reverse(suggestion.score.unwrap_or_default()));
    ranked
}
