//! Analysis configuration
//!
//! Every tunable constant of the pipeline lives here so a run can be reproduced
//! from a single JSON document.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Header lines written by the recording rig before the data rows
pub const DEFAULT_HEADER_LINES: usize = 5;

/// Parsed trials with this many rows or fewer are treated as absent
pub const DEFAULT_MIN_ROWS: usize = 10;

/// A valid trial needs strictly more samples than this
pub const DEFAULT_MIN_SAMPLES: usize = 100;

/// Trials whose recording ends before this time (ms) are dropped
pub const DEFAULT_MIN_TRIAL_TIME_MS: f64 = 17_500.0;

/// Every Nth trial is a probe
pub const DEFAULT_PROBE_INTERVAL: u32 = 10;

/// Resample grid step (ms)
pub const DEFAULT_RESAMPLE_STEP_MS: f64 = 5.0;

/// Default name of the persisted per-trial metric file
pub const DEFAULT_METRIC_FILE: &str = "area_under_curve.csv";

/// Configuration for a directory or subject-level run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lines skipped at the top of each trial file
    pub header_lines: usize,
    /// Lines starting with this prefix are comments
    pub comment_prefix: String,
    /// Parser minimum row count (at or below means "no trial")
    pub min_rows: usize,
    /// Minimum sample count for a valid trial (exclusive)
    pub min_samples: usize,
    /// Minimum recording duration for a valid trial (ms)
    pub min_trial_time_ms: f64,
    /// Probe classification interval
    pub probe_interval: u32,
    /// Resample step (ms)
    pub resample_step_ms: f64,
    /// Mean drift tolerated after resampling before warning
    pub mean_drift_tolerance: f64,
    /// Standard deviation drift tolerated after resampling before warning
    pub std_drift_tolerance: f64,
    /// Bins used for the metric distribution histogram
    pub histogram_bins: usize,
    /// Name of the per-trial metric file
    pub metric_file: String,
    /// Name of the exported summary document
    pub summary_file: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            header_lines: DEFAULT_HEADER_LINES,
            comment_prefix: "#".to_string(),
            min_rows: DEFAULT_MIN_ROWS,
            min_samples: DEFAULT_MIN_SAMPLES,
            min_trial_time_ms: DEFAULT_MIN_TRIAL_TIME_MS,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            resample_step_ms: DEFAULT_RESAMPLE_STEP_MS,
            mean_drift_tolerance: 1.0,
            std_drift_tolerance: 2.0,
            histogram_bins: 20,
            metric_file: DEFAULT_METRIC_FILE.to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> AnalysisResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.resample_step_ms.is_finite() && self.resample_step_ms > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "resample_step_ms must be positive, got {}",
                self.resample_step_ms
            )));
        }
        if self.probe_interval == 0 {
            return Err(AnalysisError::InvalidConfig(
                "probe_interval must be at least 1".to_string(),
            ));
        }
        if self.mean_drift_tolerance < 0.0 || self.std_drift_tolerance < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "drift tolerances must be non-negative".to_string(),
            ));
        }
        if self.histogram_bins == 0 {
            return Err(AnalysisError::InvalidConfig(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.metric_file.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "metric_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
