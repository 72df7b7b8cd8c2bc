use std::io::Write;

use crate::aggregate::ContingencyMatrix;
use crate::error::MatchError;
use crate::model::{Matching, SplitEvent};
use crate::order::round_to;

/// Append-only destination for split events.
pub trait SplitSink {
    fn record(&mut self, event: &SplitEvent) -> Result<(), MatchError>;
}

impl SplitSink for Vec<SplitEvent> {
    fn record(&mut self, event: &SplitEvent) -> Result<(), MatchError> {
        self.push(event.clone());
        Ok(())
    }
}

/// Pipe-delimited audit log: `region|unit|partition|confidence`.
///
/// The header is written once, on construction. Confidence is printed with
/// exactly `decimals` digits after the point.
pub struct CsvSplitSink<W: Write> {
    writer: csv::Writer<W>,
    decimals: usize,
}

impl<W: Write> CsvSplitSink<W> {
    pub fn new(inner: W, decimals: u32) -> Result<Self, MatchError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .from_writer(inner);
        writer
            .write_record(["region", "unit", "partition", "confidence"])
            .map_err(|e| MatchError::Io(e.to_string()))?;
        Ok(Self {
            writer,
            decimals: decimals as usize,
        })
    }

    pub fn flush(&mut self) -> Result<(), MatchError> {
        self.writer.flush().map_err(|e| MatchError::Io(e.to_string()))
    }

    pub fn into_inner(self) -> Result<W, MatchError> {
        self.writer.into_inner().map_err(|e| MatchError::Io(e.to_string()))
    }
}

impl<W: Write> SplitSink for CsvSplitSink<W> {
    fn record(&mut self, event: &SplitEvent) -> Result<(), MatchError> {
        let confidence = format!("{:.*}", self.decimals, event.confidence);
        self.writer
            .write_record([
                event.region.as_str(),
                event.unit.as_str(),
                event.partition.as_str(),
                confidence.as_str(),
            ])
            .map_err(|e| MatchError::Io(e.to_string()))
    }
}

/// One event per unit whose weight falls in more than one partition.
///
/// Confidence = winning partition's weight / row total, rounded to
/// `decimals`. The winner is whatever `majority` assigned.
pub fn detect_splits(
    matrix: &ContingencyMatrix,
    majority: &Matching,
    region: &str,
    decimals: u32,
) -> Vec<SplitEvent> {
    let mut events = Vec::new();

    for (i, unit) in matrix.units().iter().enumerate() {
        if matrix.nonzero_count(i) < 2 {
            continue;
        }
        let Some(partition) = majority.partition_of(unit) else {
            continue;
        };
        let total = matrix.row_total(i);
        let winner = matrix.partition_index(partition).map(|j| matrix.get(i, j)).unwrap_or(0.0);
        let confidence = if total > 0.0 { winner / total } else { 0.0 };

        log::warn!(
            "More than one partition assigned to the children of unit {unit}; \
             {:.2}% were assigned to partition {partition}",
            confidence * 100.0
        );

        events.push(SplitEvent {
            region: region.to_string(),
            unit: unit.clone(),
            partition: partition.to_string(),
            confidence: round_to(confidence, decimals),
        });
    }

    events
}
