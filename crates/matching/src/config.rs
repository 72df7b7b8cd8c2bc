use std::path::Path;

use serde::Deserialize;

use crate::error::MatchError;

/// Upper bound on any configured decimal precision.
pub const MAX_DECIMALS: u32 = 12;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    /// Region code used to label reports and split events. Never drives logic.
    #[serde(default)]
    pub region: Option<String>,
    /// Name of the fine unit being resolved (e.g. "VTD").
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Name of the partition units are matched to (e.g. "CD").
    #[serde(default = "default_partition")]
    pub partition: String,
    #[serde(default)]
    pub precision: PrecisionConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            region: None,
            unit: default_unit(),
            partition: default_partition(),
            precision: PrecisionConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

fn default_unit() -> String {
    "unit".into()
}

fn default_partition() -> String {
    "partition".into()
}

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PrecisionConfig {
    /// Decimals kept on split-event confidences.
    #[serde(default = "default_split_decimals")]
    pub split_confidence: u32,
    /// Decimals kept on every float in the quality report.
    #[serde(default = "default_report_decimals")]
    pub report: u32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            split_confidence: default_split_decimals(),
            report: default_report_decimals(),
        }
    }
}

fn default_split_decimals() -> u32 {
    4
}

fn default_report_decimals() -> u32 {
    6
}

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    #[default]
    Natural,
    Binary,
    Decimal,
}

impl LogBase {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Natural => x.ln(),
            Self::Binary => x.log2(),
            Self::Decimal => x.log10(),
        }
    }
}

impl std::fmt::Display for LogBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Natural => write!(f, "natural"),
            Self::Binary => write!(f, "binary"),
            Self::Decimal => write!(f, "decimal"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub log: LogBase,
    /// Fixed histogram bin count. `None` uses the automatic heuristic,
    /// which stops at `quality::MAX_AUTO_BINS`.
    #[serde(default)]
    pub histogram_bins: Option<usize>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, MatchError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.unit.trim().is_empty() {
            return Err(MatchError::ConfigValidation("unit label must not be empty".into()));
        }
        if self.partition.trim().is_empty() {
            return Err(MatchError::ConfigValidation(
                "partition label must not be empty".into(),
            ));
        }

        for (name, value) in [
            ("precision.split_confidence", self.precision.split_confidence),
            ("precision.report", self.precision.report),
        ] {
            if value > MAX_DECIMALS {
                return Err(MatchError::ConfigValidation(format!(
                    "{name} must be at most {MAX_DECIMALS}, got {value}"
                )));
            }
        }

        if self.quality.histogram_bins == Some(0) {
            return Err(MatchError::ConfigValidation(
                "quality.histogram_bins must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Copy of this config labelled for another region.
    pub fn for_region(&self, region: &str) -> Self {
        Self {
            region: Some(region.to_string()),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
region = "26"
unit = "VTD"
partition = "CD"

[precision]
split_confidence = 3
report = 5

[quality]
log = "binary"
histogram_bins = 10
"#;

    #[test]
    fn parse_full() {
        let config = MatchConfig::from_toml(FULL).unwrap();
        assert_eq!(config.region.as_deref(), Some("26"));
        assert_eq!(config.unit, "VTD");
        assert_eq!(config.partition, "CD");
        assert_eq!(config.precision.split_confidence, 3);
        assert_eq!(config.precision.report, 5);
        assert_eq!(config.quality.log, LogBase::Binary);
        assert_eq!(config.quality.histogram_bins, Some(10));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = MatchConfig::from_toml("").unwrap();
        assert!(config.region.is_none());
        assert_eq!(config.unit, "unit");
        assert_eq!(config.precision.split_confidence, 4);
        assert_eq!(config.precision.report, 6);
        assert_eq!(config.quality.log, LogBase::Natural);
        assert!(config.quality.histogram_bins.is_none());
    }

    #[test]
    fn reject_unknown_log_base() {
        let err = MatchConfig::from_toml("[quality]\nlog = \"ln\"\n").unwrap_err();
        assert!(matches!(err, MatchError::ConfigParse(_)));
    }

    #[test]
    fn reject_excess_precision() {
        let err = MatchConfig::from_toml("[precision]\nreport = 20\n").unwrap_err();
        assert!(err.to_string().contains("precision.report"));
    }

    #[test]
    fn reject_zero_bins() {
        let err = MatchConfig::from_toml("[quality]\nhistogram_bins = 0\n").unwrap_err();
        assert!(err.to_string().contains("histogram_bins"));
    }

    #[test]
    fn reject_blank_unit_label() {
        let err = MatchConfig::from_toml("unit = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("unit label"));
    }

    #[test]
    fn for_region_overrides_label_only() {
        let config = MatchConfig::from_toml(FULL).unwrap().for_region("13");
        assert_eq!(config.region.as_deref(), Some("13"));
        assert_eq!(config.unit, "VTD");
        assert_eq!(config.precision.report, 5);
    }

    #[test]
    fn log_bases() {
        assert_eq!(LogBase::Binary.apply(8.0), 3.0);
        assert!((LogBase::Decimal.apply(100.0) - 2.0).abs() < 1e-12);
        assert_eq!(LogBase::Natural.apply(1.0), 0.0);
    }
}
