//! Error types for Blink Flux

use crate::types::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema violation at line {line}: {message}")]
    SchemaError { line: usize, message: String },

    #[error("Invalid value for column '{column}' at line {line}: '{value}'")]
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("Trial has no {0} samples")]
    MissingPhase(Phase),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Cannot resample an empty trial set")]
    EmptyTrialSet,

    #[error("Trial time ranges do not overlap (tmin {tmin} > tmax {tmax})")]
    DisjointTimeRanges { tmin: f64, tmax: f64 },

    #[error("Interpolation point {t} outside observed range [{min}, {max}]")]
    OutOfRange { t: f64, min: f64, max: f64 },

    #[error("No trial files found under {}", .0.display())]
    NoTrialFiles(PathBuf),

    #[error("No usable trials: all {dropped} trials were dropped")]
    NoUsableTrials { dropped: usize },

    #[error("Malformed metric file {}: {message}", .path.display())]
    MalformedMetricFile { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate
pub type AnalysisResult<T> = Result<T, AnalysisError>;
