use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A child record is missing its unit or carries an invalid weight.
    /// Fatal for the whole region's aggregation.
    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (precision out of range, zero bins, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// JSON serialization of a report failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error (config file read, split sink write, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

/// Units that no resolved neighbor could reach once imputation stopped
/// making progress.
///
/// Returned as part of a normal run result. It implements `Error` so a
/// caller that considers a partial matching fatal can promote it with `?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{count} unit(s) unresolved after imputation: {}", .unit_ids.join(", "))]
pub struct UnresolvedAfterImputation {
    pub count: usize,
    pub unit_ids: Vec<String>,
}

impl UnresolvedAfterImputation {
    pub fn new(unit_ids: Vec<String>) -> Self {
        Self {
            count: unit_ids.len(),
            unit_ids,
        }
    }
}
