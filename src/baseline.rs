//! Baseline computation
//!
//! The baseline is the mean sensor level over the PRE phase. Every area metric is
//! measured relative to it.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{Phase, Trial};

/// Mean sensor value over the samples of one phase
pub fn phase_mean(trial: &Trial, phase: &Phase) -> Option<f64> {
    let (sum, count) = trial
        .phase_samples(phase)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.sensor, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Baseline of a trial: mean sensor value over PRE.
///
/// A trial that reaches the metric engine has already been checked for a PRE
/// segment, so an empty one here is an invariant violation, not bad input.
pub fn baseline(trial: &Trial) -> AnalysisResult<f64> {
    phase_mean(trial, &Phase::Pre).ok_or_else(|| {
        AnalysisError::InvariantViolation(format!(
            "trial {} has no PRE samples but reached the metric engine",
            trial.index
        ))
    })
}
