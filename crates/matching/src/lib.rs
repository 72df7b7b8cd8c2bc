//! `blockmatch` — weighted unit-to-partition matching engine.
//!
//! Pure engine crate: receives pre-loaded child records and an adjacency
//! graph, returns a matching, split audit trail and quality report.
//! No file parsing or geometry.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod impute;
pub mod majority;
pub mod model;
pub mod order;
pub mod quality;
pub mod splits;

pub use aggregate::{aggregate_records, ContingencyMatrix};
pub use config::MatchConfig;
pub use engine::{run, run_regions, RegionInput, RegionRun};
pub use error::{MatchError, UnresolvedAfterImputation};
pub use graph::{AdjacencyGraph, AdjacencyList};
pub use impute::{impute_from_neighbors, ImputationOutcome};
pub use majority::resolve_majority;
pub use model::{Assignment, ChildRecord, Matching, MatchOutput, Provenance, QualityReport, SplitEvent};
pub use quality::analyze;
pub use splits::{detect_splits, CsvSplitSink, SplitSink};
