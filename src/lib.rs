//! Blink Flux - analysis engine for eye-blink conditioning experiments
//!
//! Flux turns raw rig recordings into per-trial performance metrics and
//! cross-trial summaries through a deterministic pipeline:
//! parsing → validation → metric derivation → alignment → resampling →
//! directory aggregation → subject aggregation.
//!
//! ## Modules
//!
//! - **Trial Pipeline**: Parse, validate and summarize one session directory
//! - **Subject Module**: Group session metrics into per-subject performance curves

pub mod aggregate;
pub mod alignment;
pub mod baseline;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod metrics_file;
pub mod pipeline;
pub mod resample;
pub mod schema;
pub mod subject;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregate::{DirectoryScan, DirectorySummary};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use features::{compute_area_under_curve, MetricEngine};
pub use pipeline::{discover_trials, TrialSetProcessor};
pub use resample::Resampler;
pub use subject::{SessionId, SubjectAggregator, SubjectRecord};

// Schema exports
pub use schema::{TrialParser, TrialSchema};

/// Crate version embedded in all summary exports
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for summary exports
pub const PRODUCER_NAME: &str = "blink-flux";
