//! Summary encoding
//!
//! This module packages a [`DirectorySummary`] into a self-describing JSON
//! document for the rendering layer, stamped with producer and provenance.

use crate::aggregate::{DirectorySummary, DroppedTrial, IntensityMatrix, MetricHistogram};
use crate::error::AnalysisResult;
use crate::resample::DirectoryBounds;
use crate::types::{AlignedSeries, DriftReport, TrialMetrics};
use crate::{CRATE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current export schema version
pub const SUMMARY_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_dir: String,
    pub computed_at_utc: String,
}

/// Drift of one resampled trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDrift {
    pub index: u32,
    #[serde(flatten)]
    pub drift: DriftReport,
}

/// Exported directory summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryExport {
    pub summary_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    /// Area under the curve per valid trial, trial-index order
    pub metric_vector: Vec<f64>,
    pub trials: Vec<TrialMetrics>,
    pub dropped: Vec<DroppedTrial>,
    pub histogram: Option<MetricHistogram>,
    pub grand_average: AlignedSeries,
    pub regular_matrix: IntensityMatrix,
    pub probe_matrix: IntensityMatrix,
    pub bounds: DirectoryBounds,
    pub drift: Vec<TrialDrift>,
}

/// Encoder for producing summary exports
pub struct SummaryEncoder {
    instance_id: String,
}

impl Default for SummaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, summary: &DirectorySummary, source_dir: &Path) -> SummaryExport {
        let drift = [&summary.regular, &summary.probes]
            .into_iter()
            .flat_map(|set| set.trial_indices.iter().zip(&set.drift))
            .filter_map(|(&index, drift)| drift.map(|drift| TrialDrift { index, drift }))
            .collect();

        SummaryExport {
            summary_version: SUMMARY_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: CRATE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: Provenance {
                source_dir: source_dir.display().to_string(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            metric_vector: summary.metric_vector(),
            trials: summary.metrics.clone(),
            dropped: summary.dropped.clone(),
            histogram: summary.histogram.clone(),
            grand_average: summary.grand_average.clone(),
            regular_matrix: summary.regular_matrix.clone(),
            probe_matrix: summary.probe_matrix.clone(),
            bounds: summary.bounds,
            drift,
        }
    }

    /// Encode to pretty JSON
    pub fn encode_to_json(&self, summary: &DirectorySummary, source_dir: &Path) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(&self.encode(summary, source_dir))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DirectoryScan;
    use crate::config::AnalysisConfig;
    use crate::schema::TrialParser;
    use crate::testing::{render_csv, synthetic_rows};
    use crate::types::TrialOutcome;
    use pretty_assertions::assert_eq;

    fn summary() -> DirectorySummary {
        let parser = TrialParser::default();
        let mut scan = DirectoryScan::new(&AnalysisConfig::default());
        for index in [1, 2, 10] {
            let text = render_csv(&synthetic_rows(18_000.0, index as f64, index != 10));
            let trial = parser.parse_str(index, &text).unwrap().unwrap();
            scan.push(index, TrialOutcome::Valid(trial)).unwrap();
        }
        scan.finalize().unwrap()
    }

    #[test]
    fn test_encode_carries_producer_and_metrics() {
        let encoder = SummaryEncoder::with_instance_id("run-1".to_string());
        let export = encoder.encode(&summary(), Path::new("/data/MouseS1_SessionType1_Session1"));

        assert_eq!(export.producer.name, PRODUCER_NAME);
        assert_eq!(export.producer.instance_id, "run-1");
        assert_eq!(export.metric_vector.len(), 3);
        assert_eq!(export.drift.len(), 3);
        assert_eq!(export.regular_matrix.shape().0, 2);
        assert_eq!(export.probe_matrix.shape().0, 1);
        assert!(export.provenance.source_dir.ends_with("Session1"));
    }

    #[test]
    fn test_json_roundtrip() {
        let encoder = SummaryEncoder::new();
        let json = encoder.encode_to_json(&summary(), Path::new("/data")).unwrap();
        let export: SummaryExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export.summary_version, SUMMARY_VERSION);
        assert!(!export.producer.instance_id.is_empty());
    }
}
