use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::UnresolvedAfterImputation;
use crate::graph::AdjacencyGraph;
use crate::model::{Assignment, Matching};
use crate::order::compare_ids;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImputationOutcome {
    /// Every unit ended up with a partition.
    Complete { passes: usize, imputed: usize },
    /// A pass made no progress while units were still unresolved.
    Unresolved {
        passes: usize,
        imputed: usize,
        remaining: UnresolvedAfterImputation,
    },
}

impl ImputationOutcome {
    pub fn passes(&self) -> usize {
        match self {
            Self::Complete { passes, .. } | Self::Unresolved { passes, .. } => *passes,
        }
    }

    pub fn imputed(&self) -> usize {
        match self {
            Self::Complete { imputed, .. } | Self::Unresolved { imputed, .. } => *imputed,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn unresolved(&self) -> Option<&UnresolvedAfterImputation> {
        match self {
            Self::Complete { .. } => None,
            Self::Unresolved { remaining, .. } => Some(remaining),
        }
    }

    /// For callers that treat any leftover unit as fatal.
    pub fn into_result(self) -> Result<usize, UnresolvedAfterImputation> {
        match self {
            Self::Complete { imputed, .. } => Ok(imputed),
            Self::Unresolved { remaining, .. } => Err(remaining),
        }
    }
}

/// Most common partition among `votes`; ties go to the smallest id.
fn best_vote<'a>(votes: &BTreeMap<&'a str, usize>) -> Option<(&'a str, usize)> {
    votes
        .iter()
        .map(|(&p, &c)| (p, c))
        .max_by(|(pa, ca), (pb, cb)| ca.cmp(cb).then_with(|| compare_ids(pb, pa)))
}

/// Fill unresolved units from their resolved neighbors.
///
/// Runs passes until nothing is left or a pass resolves nothing. A pass
/// only reads assignments that existed when it started; its own decisions
/// are applied together at the end, so the outcome is the same for any
/// visiting order.
pub fn impute_from_neighbors<G>(matching: &mut Matching, graph: &G) -> ImputationOutcome
where
    G: AdjacencyGraph + ?Sized,
{
    let mut pending = matching.unresolved_ids();
    pending.sort_by(|a, b| compare_ids(a, b));

    let mut passes = 0;
    let mut imputed = 0;

    while !pending.is_empty() {
        passes += 1;

        let decisions: Vec<(String, String)> = pending
            .iter()
            .filter_map(|unit| {
                let neighbors = graph.neighbors(unit);
                let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
                for neighbor in &neighbors {
                    if let Some(partition) = matching.partition_of(neighbor) {
                        *votes.entry(partition).or_insert(0) += 1;
                    }
                }
                let (partition, count) = best_vote(&votes)?;

                let percent = count as f64 / neighbors.len() as f64 * 100.0;
                log::info!(
                    "{percent:.2}% of {unit}'s neighbors have value {partition}, \
                     so our best-guess value for {unit} is {partition}"
                );
                Some((unit.clone(), partition.to_string()))
            })
            .collect();

        if decisions.is_empty() {
            log::debug!("Imputation pass {passes} made no progress; {} unit(s) left", pending.len());
            return ImputationOutcome::Unresolved {
                passes,
                imputed,
                remaining: UnresolvedAfterImputation::new(pending),
            };
        }

        imputed += decisions.len();
        for (unit, partition) in decisions {
            matching.set(unit, Assignment::imputed(partition));
        }
        pending.retain(|unit| !matching.is_resolved(unit));
    }

    ImputationOutcome::Complete { passes, imputed }
}
