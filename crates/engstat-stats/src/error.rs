//! Error types for engstat-stats

use thiserror::Error;

/// Errors raised by the accumulators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// A histogram value fell outside the bin range under `OutOfRangePolicy::Reject`
    #[error("Value {value} outside histogram range [{low}, {high}]")]
    OutOfRange { value: f64, low: f64, high: f64 },

    /// A row had a different number of values than the accumulator has columns
    #[error("Row has {actual} values, expected {expected}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Invalid accumulator configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for accumulator operations
pub type StatsResult<T> = Result<T, StatsError>;
