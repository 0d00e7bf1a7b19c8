//! Error types for the benchmark harness
//!
//! Configuration problems are fatal and surface as [`BenchError`] before any
//! measurement starts. Numeric problems inside the statistics engine are
//! [`StatsError`]. Workloads and hooks talk back to the engine through
//! [`WorkloadError`].

use thiserror::Error;

/// Errors raised by the statistics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Invalid range: highest ({highest}) is below lowest ({lowest})")]
    InvalidRange { lowest: f64, highest: f64 },

    #[error("Probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Tolerance must be a positive number of standard deviations, got {0}")]
    InvalidTolerance(f64),

    #[error("Histogram length mismatch: expected {expected} bins, observed {observed}")]
    LengthMismatch { expected: usize, observed: usize },

    #[error("Cannot compute statistics over an empty data set")]
    EmptyData,

    #[error("No sample size up to {limit} reaches confidence {confidence} at tolerance {tolerance}")]
    NoConvergence {
        tolerance: f64,
        confidence: f64,
        limit: usize,
    },
}

/// Errors that abort a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid value '{value}' for parameter '{field}' of type {tag}")]
    InvalidParameterValue {
        field: String,
        value: String,
        tag: String,
    },

    #[error("Parameter '{field}' declares no candidate values")]
    EmptyParameterField { field: String },

    #[error("Unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("Benchmark units must be uniform: '{unit}' {reason}")]
    NonUniformBenchmarkUnits { unit: String, reason: String },

    #[error("No benchmark units to run")]
    NoBenchmarkUnits,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid method filter: {0}")]
    InvalidMethodFilter(#[from] regex::Error),

    #[error("Workload {unit}.{method} failed: {reason}")]
    WorkloadFailed {
        unit: String,
        method: String,
        reason: String,
    },

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Signal returned by a workload or hook instead of a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// Skip the current parameter row; the run continues with the next one
    #[error("skipped: {0}")]
    Skip(String),

    /// Abort the whole run
    #[error("{0}")]
    Fatal(String),
}

impl WorkloadError {
    /// Convenience constructor for [`WorkloadError::Skip`]
    pub fn skip(reason: impl Into<String>) -> Self {
        WorkloadError::Skip(reason.into())
    }

    /// Convenience constructor for [`WorkloadError::Fatal`]
    pub fn fatal(reason: impl Into<String>) -> Self {
        WorkloadError::Fatal(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = BenchError::InvalidParameterValue {
            field: "number".to_string(),
            value: "abc".to_string(),
            tag: "int".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'abc' for parameter 'number' of type int"
        );
    }

    #[test]
    fn test_stats_error_converts() {
        let err: BenchError = StatsError::EmptyData.into();
        assert!(matches!(err, BenchError::Statistics(StatsError::EmptyData)));
    }

    #[test]
    fn test_workload_error_constructors() {
        assert_eq!(
            WorkloadError::skip("negative"),
            WorkloadError::Skip("negative".to_string())
        );
        assert_eq!(WorkloadError::fatal("boom").to_string(), "boom");
    }
}
