use serde::Serialize;

use crate::model::{Matching, Provenance, SplitEvent};
use crate::order::round_to;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_units: usize,
    pub majority: usize,
    pub imputed: usize,
    pub unresolved: usize,
    pub split_units: usize,
    pub split_percent: f64,
    pub unresolved_percent: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 2)
}

/// Counts for the audit display: how each unit was resolved and how many
/// were split.
pub fn compute_summary(matching: &Matching, splits: &[SplitEvent]) -> MatchSummary {
    let total_units = matching.len();
    let majority = matching.count_by(Provenance::Majority);
    let imputed = matching.count_by(Provenance::Imputed);
    let unresolved = total_units - majority - imputed;

    MatchSummary {
        total_units,
        majority,
        imputed,
        unresolved,
        split_units: splits.len(),
        split_percent: percent(splits.len(), total_units),
        unresolved_percent: percent(unresolved, total_units),
    }
}
