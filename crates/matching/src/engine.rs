use crate::aggregate::aggregate_records;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::evidence::compute_summary;
use crate::graph::{AdjacencyGraph, AdjacencyList};
use crate::impute::impute_from_neighbors;
use crate::majority::resolve_majority;
use crate::model::{ChildRecord, MatchMeta, MatchOutput};
use crate::quality::analyze;
use crate::splits::{detect_splits, SplitSink};

/// Match one region's units to partitions.
///
/// Only malformed records and sink failures are errors. Units that stay
/// unresolved are reported in `MatchOutput::imputation`.
pub fn run<G>(
    config: &MatchConfig,
    records: &[ChildRecord],
    graph: &G,
    sink: &mut dyn SplitSink,
) -> Result<MatchOutput, MatchError>
where
    G: AdjacencyGraph + ?Sized,
{
    let region = config.region.clone().unwrap_or_default();
    let (unit, part) = (&config.unit, &config.partition);

    log::info!("Matching each {unit} to the most common {part} assignment of its children");
    let matrix = aggregate_records(records)?;

    let mut matching = resolve_majority(&matrix);

    let splits = detect_splits(&matrix, &matching, &region, config.precision.split_confidence);
    for event in &splits {
        sink.record(event)?;
    }

    let quality = analyze(&matrix, config);

    // Graph units without any children still need an entry.
    for unit_id in graph.units() {
        matching.ensure_unit(unit_id);
    }
    let imputation = impute_from_neighbors(&mut matching, graph);

    let summary = compute_summary(&matching, &splits);
    log::info!(
        "Created a matching of {} {unit}s to {part}s: {} majority, {} imputed, {} split ({}%)",
        summary.total_units,
        summary.majority,
        summary.imputed,
        summary.split_units,
        summary.split_percent
    );
    if let Some(remaining) = imputation.unresolved() {
        log::error!(
            "Region '{region}' has {} missing assignments ({}%): {}",
            remaining.count,
            summary.unresolved_percent,
            remaining.unit_ids.join(", ")
        );
    }

    Ok(MatchOutput {
        meta: MatchMeta {
            region: config.region.clone(),
            unit: config.unit.clone(),
            partition: config.partition.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        matching,
        splits,
        quality,
        imputation,
    })
}

/// Fully materialized input for one region.
#[derive(Debug, Clone)]
pub struct RegionInput<G = AdjacencyList> {
    pub region: String,
    pub records: Vec<ChildRecord>,
    pub graph: G,
}

#[derive(Debug)]
pub struct RegionRun {
    pub region: String,
    pub result: Result<MatchOutput, MatchError>,
}

/// Run every region in turn. A failing region is logged and recorded; the
/// loop carries on with the rest.
pub fn run_regions<G, I>(config: &MatchConfig, regions: I, sink: &mut dyn SplitSink) -> Vec<RegionRun>
where
    G: AdjacencyGraph,
    I: IntoIterator<Item = RegionInput<G>>,
{
    regions
        .into_iter()
        .map(|input| {
            log::info!("Working on region {}", input.region);
            let region_config = config.for_region(&input.region);
            let result = run(&region_config, &input.records, &input.graph, &mut *sink);
            if let Err(ref e) = result {
                log::error!("Skipping region {}: {e}", input.region);
            }
            RegionRun {
                region: input.region,
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Provenance, SplitEvent};

    fn rec(unit: &str, part: Option<&str>, weight: f64) -> ChildRecord {
        ChildRecord::new(unit, part, weight)
    }

    #[test]
    fn run_resolves_and_imputes() {
        let records = vec![
            rec("1", None, 1.0),
            rec("1", None, 1.0),
            rec("2", Some("2"), 1.0),
            rec("2", Some("2"), 1.0),
        ];
        let graph = AdjacencyList::from_edges([("1", "2")]);
        let mut sink: Vec<SplitEvent> = Vec::new();
        let out = run(&MatchConfig::default(), &records, &graph, &mut sink).unwrap();

        assert_eq!(out.matching.partition_of("2"), Some("2"));
        assert_eq!(out.matching.get("2").unwrap().provenance(), Some(Provenance::Majority));
        assert_eq!(out.matching.partition_of("1"), Some("2"));
        assert_eq!(out.matching.get("1").unwrap().provenance(), Some(Provenance::Imputed));
        assert!(out.imputation.is_complete());
        assert!(sink.is_empty());
        assert_eq!(out.summary.imputed, 1);
        assert_eq!(out.meta.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn splits_reach_the_sink_with_region() {
        let config = MatchConfig {
            region: Some("26".into()),
            ..MatchConfig::default()
        };
        let records = vec![rec("u", Some("A"), 3.0), rec("u", Some("B"), 1.0)];
        let mut sink: Vec<SplitEvent> = Vec::new();
        let out = run(&config, &records, &AdjacencyList::new(), &mut sink).unwrap();
        assert_eq!(sink, out.splits);
        assert_eq!(sink[0].region, "26");
        assert_eq!(sink[0].confidence, 0.75);
    }

    #[test]
    fn malformed_region_fails_and_loop_continues() {
        let regions = vec![
            RegionInput {
                region: "01".into(),
                records: vec![rec("u", Some("A"), -1.0)],
                graph: AdjacencyList::new(),
            },
            RegionInput {
                region: "02".into(),
                records: vec![rec("u", Some("A"), 1.0)],
                graph: AdjacencyList::new(),
            },
        ];
        let mut sink: Vec<SplitEvent> = Vec::new();
        let runs = run_regions(&MatchConfig::default(), regions, &mut sink);
        assert_eq!(runs.len(), 2);
        assert!(matches!(runs[0].result, Err(MatchError::MalformedRecord { .. })));
        let ok = runs[1].result.as_ref().unwrap();
        assert_eq!(ok.meta.region.as_deref(), Some("02"));
        assert_eq!(ok.quality.region.as_deref(), Some("02"));
    }
}
