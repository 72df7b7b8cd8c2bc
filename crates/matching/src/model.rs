use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{MatchError, UnresolvedAfterImputation};
use crate::evidence::MatchSummary;
use crate::impute::ImputationOutcome;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One weighted child observation (e.g. a census block).
///
/// `partition_id` is `None` when the child carries no partition label; the
/// unit is still registered but receives no weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRecord {
    pub unit_id: String,
    pub partition_id: Option<String>,
    pub weight: f64,
}

impl ChildRecord {
    pub fn new(unit_id: impl Into<String>, partition_id: Option<&str>, weight: f64) -> Self {
        Self {
            unit_id: unit_id.into(),
            partition_id: partition_id.map(str::to_string),
            weight,
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Majority,
    Imputed,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Majority => write!(f, "majority"),
            Self::Imputed => write!(f, "imputed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Assignment {
    Resolved {
        partition: String,
        provenance: Provenance,
    },
    Unresolved,
}

impl Assignment {
    pub fn majority(partition: impl Into<String>) -> Self {
        Self::Resolved {
            partition: partition.into(),
            provenance: Provenance::Majority,
        }
    }

    pub fn imputed(partition: impl Into<String>) -> Self {
        Self::Resolved {
            partition: partition.into(),
            provenance: Provenance::Imputed,
        }
    }

    pub fn partition(&self) -> Option<&str> {
        match self {
            Self::Resolved { partition, .. } => Some(partition),
            Self::Unresolved => None,
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Self::Resolved { provenance, .. } => Some(*provenance),
            Self::Unresolved => None,
        }
    }
}

/// Unit → assignment, ordered by unit id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Matching {
    assignments: BTreeMap<String, Assignment>,
}

impl Matching {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, unit_id: impl Into<String>, assignment: Assignment) {
        self.assignments.insert(unit_id.into(), assignment);
    }

    /// Register a unit as unresolved unless it already has an entry.
    pub fn ensure_unit(&mut self, unit_id: &str) {
        if !self.assignments.contains_key(unit_id) {
            self.assignments.insert(unit_id.to_string(), Assignment::Unresolved);
        }
    }

    pub fn get(&self, unit_id: &str) -> Option<&Assignment> {
        self.assignments.get(unit_id)
    }

    pub fn partition_of(&self, unit_id: &str) -> Option<&str> {
        self.assignments.get(unit_id).and_then(Assignment::partition)
    }

    pub fn is_resolved(&self, unit_id: &str) -> bool {
        self.partition_of(unit_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Assignment)> {
        self.assignments.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn unresolved_ids(&self) -> Vec<String> {
        self.assignments
            .iter()
            .filter(|(_, a)| matches!(a, Assignment::Unresolved))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn count_by(&self, provenance: Provenance) -> usize {
        self.assignments
            .values()
            .filter(|a| a.provenance() == Some(provenance))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Splits
// ---------------------------------------------------------------------------

/// One audit-log entry for a unit whose children disagree on partition.
/// Field order is the serialized column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitEvent {
    pub region: String,
    pub unit: String,
    pub partition: String,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Quality report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<[f64; 2]>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitioned_by: Option<String>,
    pub splitting_energy: f64,
    pub splitting_confidences: BTreeMap<String, f64>,
    pub histogram: Histogram,
}

impl QualityReport {
    pub fn to_json(&self) -> Result<String, MatchError> {
        serde_json::to_string_pretty(self).map_err(|e| MatchError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MatchMeta {
    pub region: Option<String>,
    pub unit: String,
    pub partition: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    pub meta: MatchMeta,
    pub summary: MatchSummary,
    pub matching: Matching,
    pub splits: Vec<SplitEvent>,
    pub quality: QualityReport,
    pub imputation: ImputationOutcome,
}

impl MatchOutput {
    /// Units left without a partition, if any.
    pub fn unresolved(&self) -> Option<&UnresolvedAfterImputation> {
        self.imputation.unresolved()
    }

    pub fn to_json(&self) -> Result<String, MatchError> {
        serde_json::to_string_pretty(self).map_err(|e| MatchError::Serialization(e.to_string()))
    }
}
