use std::cmp::Ordering;

use crate::aggregate::ContingencyMatrix;
use crate::model::{Assignment, Matching};
use crate::order::compare_ids;

/// Heaviest partition of row `i` as (partition index, weight).
///
/// Equal weights break toward the smallest partition id, so the answer
/// does not depend on how the matrix was indexed. `None` for an all-zero row.
pub fn winning_partition(matrix: &ContingencyMatrix, i: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (j, w) in matrix.row(i) {
        best = match best {
            None => Some((j, w)),
            Some((bj, bw)) => {
                let better = match w.partial_cmp(&bw).unwrap_or(Ordering::Equal) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        let a = matrix.partition_id(j).unwrap_or_default();
                        let b = matrix.partition_id(bj).unwrap_or_default();
                        compare_ids(a, b) == Ordering::Less
                    }
                };
                if better {
                    Some((j, w))
                } else {
                    Some((bj, bw))
                }
            }
        };
    }
    best
}

/// Assign each unit the partition holding most of its weight.
///
/// Units with an all-zero row come back `Unresolved`. Pure function of the
/// matrix, so repeated calls agree.
pub fn resolve_majority(matrix: &ContingencyMatrix) -> Matching {
    let mut matching = Matching::new();
    for (i, unit) in matrix.units().iter().enumerate() {
        let assignment = match winning_partition(matrix, i).and_then(|(j, _)| matrix.partition_id(j)) {
            Some(partition) => Assignment::majority(partition),
            None => Assignment::Unresolved,
        };
        matching.set(unit.clone(), assignment);
    }
    matching
}
