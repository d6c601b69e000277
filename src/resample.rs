//! Resampling of aligned trials onto a shared time grid
//!
//! Two separate notions of a time window live here:
//! - the per-call window, the intersection of every trial's observed range,
//!   which bounds interpolation;
//! - [`DirectoryBounds`], which widens across calls and only bounds plotting.

use crate::config::{AnalysisConfig, DEFAULT_RESAMPLE_STEP_MS};
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{AlignedSeries, DriftReport, TimeWindow, Trial};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Intersect observed `(min, max)` ranges: latest start, earliest end
pub fn intersect_windows<I>(ranges: I) -> AnalysisResult<TimeWindow>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut window: Option<TimeWindow> = None;
    for (lo, hi) in ranges {
        window = Some(match window {
            None => TimeWindow { tmin: lo, tmax: hi },
            Some(w) => TimeWindow {
                tmin: w.tmin.max(lo),
                tmax: w.tmax.min(hi),
            },
        });
    }
    let window = window.ok_or(AnalysisError::EmptyTrialSet)?;
    if window.tmin > window.tmax {
        return Err(AnalysisError::DisjointTimeRanges {
            tmin: window.tmin,
            tmax: window.tmax,
        });
    }
    Ok(window)
}

/// Window common to every trial in the set
pub fn common_window(trials: &[Trial]) -> AnalysisResult<TimeWindow> {
    let ranges = trials
        .iter()
        .map(|t| t.time_range().ok_or(AnalysisError::EmptyTrialSet))
        .collect::<AnalysisResult<Vec<_>>>()?;
    intersect_windows(ranges)
}

/// Half-open uniform grid `tmin, tmin + step, ...` strictly below `tmax`
pub fn uniform_grid(window: TimeWindow, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || window.tmax <= window.tmin {
        return Vec::new();
    }
    let n = ((window.tmax - window.tmin) / step).ceil() as usize;
    (0..n)
        .map(|k| window.tmin + k as f64 * step)
        .filter(|t| *t < window.tmax)
        .collect()
}

/// Nearest-sample interpolation of `(times, values)` at each grid point.
///
/// `times` must be non-decreasing. At an exact midpoint the earlier sample wins.
/// Points outside the observed range are an error; no extrapolation.
pub fn interpolate_nearest(times: &[f64], values: &[f64], grid: &[f64]) -> AnalysisResult<Vec<f64>> {
    if times.is_empty() || times.len() != values.len() {
        return Err(AnalysisError::InvariantViolation(format!(
            "interpolation needs matching non-empty inputs ({} times, {} values)",
            times.len(),
            values.len()
        )));
    }
    let (min, max) = (times[0], times[times.len() - 1]);

    grid.iter()
        .map(|&t| {
            if t < min || t > max {
                return Err(AnalysisError::OutOfRange { t, min, max });
            }
            let idx = times.partition_point(|&x| x < t);
            if idx == 0 {
                return Ok(values[0]);
            }
            let lo = idx - 1;
            let nearest = if t - times[lo] <= times[idx] - t { lo } else { idx };
            Ok(values[nearest])
        })
        .collect()
}

/// Population mean and standard deviation
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Compare resampled statistics with the original series
pub fn drift_report(original: &[f64], resampled: &[f64]) -> Option<DriftReport> {
    let (m0, s0) = mean_std(original)?;
    let (m1, s1) = mean_std(resampled)?;
    Some(DriftReport {
        mean_error: (m1 - m0).abs(),
        std_error: (s1 - s0).abs(),
    })
}

/// Output of resampling one trial set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResampledSet {
    /// Shared window for this set; `None` when the set is empty
    pub window: Option<TimeWindow>,
    /// Trial indices, one per series
    pub trial_indices: Vec<u32>,
    pub series: Vec<AlignedSeries>,
    /// Drift per series; `None` for an empty grid
    pub drift: Vec<Option<DriftReport>>,
}

impl ResampledSet {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Shared time grid (empty for an empty set)
    pub fn time_grid(&self) -> &[f64] {
        self.series
            .first()
            .map(|s| s.time_grid.as_slice())
            .unwrap_or(&[])
    }
}

/// Resampler with a fixed step and drift tolerances
#[derive(Debug, Clone)]
pub struct Resampler {
    step: f64,
    mean_tolerance: f64,
    std_tolerance: f64,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(DEFAULT_RESAMPLE_STEP_MS)
    }
}

impl Resampler {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            mean_tolerance: 1.0,
            std_tolerance: 2.0,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            step: config.resample_step_ms,
            mean_tolerance: config.mean_drift_tolerance,
            std_tolerance: config.std_drift_tolerance,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Resample one trial onto the grid of `window`
    pub fn resample_trial(
        &self,
        trial: &Trial,
        window: TimeWindow,
    ) -> AnalysisResult<(AlignedSeries, Option<DriftReport>)> {
        let grid = uniform_grid(window, self.step);
        let original = trial.sensor_values();
        let values = interpolate_nearest(&trial.times(), &original, &grid)?;

        let drift = drift_report(&original, &values);
        if let Some(report) = drift {
            if report.mean_error > self.mean_tolerance {
                warn!(
                    trial = trial.index,
                    error = report.mean_error,
                    "mean drifted after resampling"
                );
            }
            if report.std_error > self.std_tolerance {
                warn!(
                    trial = trial.index,
                    error = report.std_error,
                    "standard deviation drifted after resampling"
                );
            }
        }

        Ok((
            AlignedSeries {
                time_grid: grid,
                values,
            },
            drift,
        ))
    }

    /// Resample every trial onto the window common to the whole set
    pub fn resample_set(&self, trials: &[Trial]) -> AnalysisResult<ResampledSet> {
        let window = common_window(trials)?;
        let mut set = ResampledSet {
            window: Some(window),
            ..Default::default()
        };
        for trial in trials {
            let (series, drift) = self.resample_trial(trial, window)?;
            set.trial_indices.push(trial.index);
            set.series.push(series);
            set.drift.push(drift);
        }
        Ok(set)
    }
}

/// Plot bounds that widen monotonically across resample calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryBounds {
    pub xmin: Option<f64>,
    pub xmax: Option<f64>,
}

impl DirectoryBounds {
    /// Fold a per-call window in: xmin only decreases, xmax only increases
    pub fn fold(&mut self, window: TimeWindow) {
        self.xmin = Some(self.xmin.map_or(window.tmin, |x| x.min(window.tmin)));
        self.xmax = Some(self.xmax.map_or(window.tmax, |x| x.max(window.tmax)));
    }

    pub fn as_window(&self) -> Option<TimeWindow> {
        Some(TimeWindow {
            tmin: self.xmin?,
            tmax: self.xmax?,
        })
    }
}
