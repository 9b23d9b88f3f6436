//! Error types for engstat-core

use engstat_io::IoError;
use engstat_stats::StatsError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Main error type for analysis operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The source failed to produce metadata or rows
    #[error("Source error: {0}")]
    Source(#[from] IoError),

    /// A requested column has no unique match in the schema
    #[error("Schema error for column '{column}': {reason}")]
    Schema { column: String, reason: String },

    /// An accumulator rejected its input or configuration
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    /// Invalid analysis configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Wrap a failed column lookup
    pub(crate) fn schema(column: &str, source: IoError) -> Self {
        let reason = match source {
            IoError::ColumnNotFound(_) => "no such column".to_string(),
            IoError::AmbiguousColumn(_) => "matches more than one column".to_string(),
            other => other.to_string(),
        };
        AnalysisError::Schema {
            column: column.to_string(),
            reason,
        }
    }

    /// Whether the offending row may be skipped
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::Source(e) if e.is_recoverable())
    }
}
