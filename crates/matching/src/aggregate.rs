use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::MatchError;
use crate::model::ChildRecord;
use crate::order::compare_ids;

/// Weighted unit × partition contingency table.
///
/// Sparse: only positive cells are stored, everything else reads as 0.
/// A unit with no positive cell is an all-zero row, not a missing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContingencyMatrix {
    units: Vec<String>,
    partitions: Vec<String>,
    unit_index: HashMap<String, usize>,
    partition_index: HashMap<String, usize>,
    cells: BTreeMap<(usize, usize), f64>,
}

impl ContingencyMatrix {
    fn with_ids(units: Vec<String>, partitions: Vec<String>) -> Self {
        let unit_index = units.iter().enumerate().map(|(i, u)| (u.clone(), i)).collect();
        let partition_index = partitions
            .iter()
            .enumerate()
            .map(|(j, p)| (p.clone(), j))
            .collect();
        Self {
            units,
            partitions,
            unit_index,
            partition_index,
            cells: BTreeMap::new(),
        }
    }

    /// Build from dense rows, keeping the given id order. Mostly for tests
    /// and callers that already hold a table. Ids must be unique per axis.
    pub fn from_dense(units: &[&str], partitions: &[&str], rows: &[Vec<f64>]) -> Result<Self, MatchError> {
        check_unique("unit", units)?;
        check_unique("partition", partitions)?;
        if rows.len() != units.len() {
            return Err(MatchError::MalformedRecord {
                index: rows.len().min(units.len()),
                reason: format!("{} rows for {} units", rows.len(), units.len()),
            });
        }
        let mut matrix = Self::with_ids(
            units.iter().map(|u| u.to_string()).collect(),
            partitions.iter().map(|p| p.to_string()).collect(),
        );
        for (i, row) in rows.iter().enumerate() {
            if row.len() != partitions.len() {
                return Err(MatchError::MalformedRecord {
                    index: i,
                    reason: format!("row has {} cells, expected {}", row.len(), partitions.len()),
                });
            }
            for (j, &weight) in row.iter().enumerate() {
                check_weight(i, weight)?;
                matrix.add(i, j, weight);
            }
        }
        Ok(matrix)
    }

    fn add(&mut self, i: usize, j: usize, weight: f64) {
        if weight > 0.0 {
            *self.cells.entry((i, j)).or_insert(0.0) += weight;
        }
    }

    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    pub fn n_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }

    pub fn unit_id(&self, i: usize) -> Option<&str> {
        self.units.get(i).map(String::as_str)
    }

    pub fn partition_id(&self, j: usize) -> Option<&str> {
        self.partitions.get(j).map(String::as_str)
    }

    pub fn unit_index(&self, unit_id: &str) -> Option<usize> {
        self.unit_index.get(unit_id).copied()
    }

    pub fn partition_index(&self, partition_id: &str) -> Option<usize> {
        self.partition_index.get(partition_id).copied()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells.get(&(i, j)).copied().unwrap_or(0.0)
    }

    /// Nonzero cells of row `i` as (partition index, weight), by index.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cells
            .range((i, 0)..=(i, usize::MAX))
            .map(|(&(_, j), &w)| (j, w))
    }

    pub fn nonzero_count(&self, i: usize) -> usize {
        self.row(i).count()
    }

    pub fn row_total(&self, i: usize) -> f64 {
        self.row(i).map(|(_, w)| w).sum()
    }

    pub fn row_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.units.len()];
        for (&(i, _), &w) in &self.cells {
            totals[i] += w;
        }
        totals
    }

    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }
}

fn check_unique(axis: &str, ids: &[&str]) -> Result<(), MatchError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for (index, id) in ids.iter().enumerate() {
        if !seen.insert(*id) {
            return Err(MatchError::MalformedRecord {
                index,
                reason: format!("duplicate {axis} id '{id}'"),
            });
        }
    }
    Ok(())
}

fn check_weight(index: usize, weight: f64) -> Result<(), MatchError> {
    if !weight.is_finite() {
        return Err(MatchError::MalformedRecord {
            index,
            reason: format!("non-finite weight {weight}"),
        });
    }
    if weight < 0.0 {
        return Err(MatchError::MalformedRecord {
            index,
            reason: format!("negative weight {weight}"),
        });
    }
    Ok(())
}

fn partition_label(record: &ChildRecord) -> Option<&str> {
    record
        .partition_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

fn sorted_unique(mut ids: Vec<String>) -> Vec<String> {
    ids.sort_by(|a, b| compare_ids(a, b));
    ids.dedup();
    ids
}

/// Validate every record, index observed ids in natural order, then sum
/// weights per (unit, partition).
///
/// Any malformed record rejects the whole set.
pub fn aggregate_records(records: &[ChildRecord]) -> Result<ContingencyMatrix, MatchError> {
    let mut unit_ids = Vec::new();
    let mut partition_ids = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.unit_id.trim().is_empty() {
            return Err(MatchError::MalformedRecord {
                index,
                reason: "missing unit id".into(),
            });
        }
        check_weight(index, record.weight)?;
        unit_ids.push(record.unit_id.clone());
        if let Some(p) = partition_label(record) {
            partition_ids.push(p.to_string());
        }
    }

    let mut matrix = ContingencyMatrix::with_ids(sorted_unique(unit_ids), sorted_unique(partition_ids));

    for record in records {
        let Some(p) = partition_label(record) else { continue };
        if let (Some(i), Some(j)) = (matrix.unit_index(&record.unit_id), matrix.partition_index(p)) {
            matrix.add(i, j, record.weight);
        }
    }

    log::debug!(
        "Aggregated {} records into {} units x {} partitions",
        records.len(),
        matrix.n_units(),
        matrix.n_partitions()
    );

    Ok(matrix)
}
