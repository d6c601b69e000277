//! Plain-text metric vectors
//!
//! One float per line, in trial-index order. Readers accept any whitespace
//! between values.

use crate::error::{AnalysisError, AnalysisResult};
use std::fs;
use std::path::Path;

/// Render a metric vector, one value per line in scientific notation
pub fn format_metric_vector(values: &[f64]) -> String {
    values.iter().map(|v| format!("{:.18e}\n", v)).collect()
}

/// Parse whitespace-separated floats
pub fn parse_metric_vector(text: &str) -> Result<Vec<f64>, String> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token
                .parse::<f64>()
                .map_err(|_| format!("value {} is not a number: '{}'", i + 1, token))
        })
        .collect()
}

pub fn write_metric_vector(path: &Path, values: &[f64]) -> AnalysisResult<()> {
    fs::write(path, format_metric_vector(values))?;
    Ok(())
}

/// Read a metric file; an empty file yields an empty vector
pub fn read_metric_vector(path: &Path) -> AnalysisResult<Vec<f64>> {
    let text = fs::read_to_string(path)?;
    parse_metric_vector(&text).map_err(|message| AnalysisError::MalformedMetricFile {
        path: path.to_path_buf(),
        message,
    })
}
