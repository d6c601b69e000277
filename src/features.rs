//! Metric engine
//!
//! Derives the per-trial performance metric: the area between the sensor curve
//! and the PRE baseline over the TONE and TRACE phases.
//!
//! Each interval between consecutive samples of a phase contributes its width
//! times the absolute deviation of the *later* sample from baseline. This is a
//! one-sided rectangle rule, kept for compatibility with previously published
//! metric files. Areas are not normalized by duration.

use crate::baseline::baseline;
use crate::error::AnalysisResult;
use crate::types::{Phase, Trial, TrialKind, TrialMetrics};

/// Millisecond-weighted area to canonical units
const MS_PER_UNIT: f64 = 1000.0;

/// Phases that contribute to the area metric
pub const AREA_PHASES: [Phase; 2] = [Phase::Tone, Phase::Trace];

/// Area of one phase relative to `baseline`
pub fn phase_area(trial: &Trial, phase: &Phase, baseline: f64) -> f64 {
    let samples: Vec<_> = trial.phase_samples(phase).collect();
    let area: f64 = samples
        .windows(2)
        .map(|pair| (pair[1].time - pair[0].time) * (pair[1].sensor - baseline).abs())
        .sum();
    area / MS_PER_UNIT
}

/// TONE + TRACE area under the curve relative to the PRE baseline
pub fn compute_area_under_curve(trial: &Trial) -> AnalysisResult<f64> {
    let base = baseline(trial)?;
    Ok(AREA_PHASES
        .iter()
        .map(|phase| phase_area(trial, phase, base))
        .sum())
}

/// Metric engine for computing per-trial metrics
pub struct MetricEngine;

impl MetricEngine {
    /// Derive all metrics for a trial of the given kind
    pub fn derive(trial: &Trial, kind: TrialKind) -> AnalysisResult<TrialMetrics> {
        let base = baseline(trial)?;
        let tone_area = phase_area(trial, &Phase::Tone, base);
        let trace_area = phase_area(trial, &Phase::Trace, base);

        Ok(TrialMetrics {
            index: trial.index,
            kind,
            baseline: base,
            tone_area,
            trace_area,
            area_under_curve: tone_area + trace_area,
            has_puff: trial.puff_segment().is_some(),
        })
    }
}
