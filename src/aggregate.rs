//! Trial-set aggregation
//!
//! Collects the trials of one session directory, classifies them into regular
//! and probe sets, aligns and resamples each set, and derives the grand-average
//! curve, intensity matrices and the per-trial metric distribution.
//!
//! All running state lives in [`DirectoryScan`]; [`DirectoryScan::finalize`] is
//! the single step that turns it into a [`DirectorySummary`].

use crate::alignment::align_to_last_tone;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::features::MetricEngine;
use crate::resample::{DirectoryBounds, ResampledSet, Resampler};
use crate::types::{
    AlignedSeries, DropReason, Phase, TimeWindow, Trial, TrialKind, TrialMetrics, TrialOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Decides whether a parsed trial is usable
#[derive(Debug, Clone)]
pub struct TrialValidator {
    min_samples: usize,
    min_trial_time_ms: f64,
}

impl Default for TrialValidator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl TrialValidator {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            min_trial_time_ms: config.min_trial_time_ms,
        }
    }

    /// Check sample count, duration, then the PRE and TONE phases
    pub fn validate(&self, trial: Trial) -> TrialOutcome {
        if trial.len() <= self.min_samples {
            return TrialOutcome::Dropped(DropReason::TooFewSamples {
                samples: trial.len(),
                min: self.min_samples,
            });
        }
        let max_time = trial.max_time().unwrap_or(f64::NEG_INFINITY);
        if max_time < self.min_trial_time_ms {
            return TrialOutcome::Dropped(DropReason::TooShort {
                max_time_ms: max_time,
                min_ms: self.min_trial_time_ms,
            });
        }
        for phase in [Phase::Pre, Phase::Tone] {
            if !trial.has_phase(&phase) {
                return TrialOutcome::Dropped(DropReason::MissingPhase { phase });
            }
        }
        TrialOutcome::Valid(trial)
    }
}

/// A trial excluded from aggregation and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedTrial {
    pub index: u32,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Trial x time matrix of resampled sensor values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityMatrix {
    pub trial_indices: Vec<u32>,
    pub rows: Vec<Vec<f64>>,
    /// First and last grid point
    pub time_extent: Option<TimeWindow>,
}

impl IntensityMatrix {
    pub fn from_set(set: &ResampledSet) -> Self {
        let grid = set.time_grid();
        let time_extent = match (grid.first(), grid.last()) {
            (Some(&tmin), Some(&tmax)) => Some(TimeWindow { tmin, tmax }),
            _ => None,
        };
        Self {
            trial_indices: set.trial_indices.clone(),
            rows: set.series.iter().map(|s| s.values.clone()).collect(),
            time_extent,
        }
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }
}

/// Equal-width histogram of the per-trial metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricHistogram {
    /// `bins + 1` edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl MetricHistogram {
    /// Bin `values` over `[min, max]`; the last bin includes its right edge.
    /// A constant input is binned over `[v - 0.5, v + 0.5]`.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }
        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0; bins];
        for v in values {
            let bin = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[bin] += 1;
        }
        Some(Self { edges, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Mean across series at every grid point
pub fn grand_average(set: &ResampledSet) -> AlignedSeries {
    let Some(first) = set.series.first() else {
        return AlignedSeries::default();
    };
    let mut sums = vec![0.0; first.len()];
    for series in &set.series {
        for (acc, v) in sums.iter_mut().zip(&series.values) {
            *acc += v;
        }
    }
    let n = set.series.len() as f64;
    AlignedSeries {
        time_grid: first.time_grid.clone(),
        values: sums.into_iter().map(|s| s / n).collect(),
    }
}

/// Finalized results for one session directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorySummary {
    /// One entry per valid trial, in trial-index order
    pub metrics: Vec<TrialMetrics>,
    pub dropped: Vec<DroppedTrial>,
    pub regular: ResampledSet,
    pub probes: ResampledSet,
    /// Widened plot bounds over both sets
    pub bounds: DirectoryBounds,
    /// Mean of the regular set
    pub grand_average: AlignedSeries,
    pub regular_matrix: IntensityMatrix,
    pub probe_matrix: IntensityMatrix,
    pub histogram: Option<MetricHistogram>,
}

impl DirectorySummary {
    /// Exported metric vector: area under the curve per valid trial
    pub fn metric_vector(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.area_under_curve).collect()
    }

    pub fn count(&self, kind: TrialKind) -> usize {
        self.metrics.iter().filter(|m| m.kind == kind).count()
    }
}

/// Incremental scan of one directory's trials
#[derive(Debug)]
pub struct DirectoryScan {
    probe_interval: u32,
    histogram_bins: usize,
    resampler: Resampler,
    metrics: Vec<TrialMetrics>,
    regular: Vec<Trial>,
    probes: Vec<Trial>,
    dropped: Vec<DroppedTrial>,
    last_index: Option<u32>,
}

impl DirectoryScan {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            probe_interval: config.probe_interval,
            histogram_bins: config.histogram_bins,
            resampler: Resampler::from_config(config),
            metrics: Vec::new(),
            regular: Vec::new(),
            probes: Vec::new(),
            dropped: Vec::new(),
            last_index: None,
        }
    }

    /// Number of trials pushed so far, valid or not
    pub fn seen(&self) -> usize {
        self.metrics.len() + self.dropped.len()
    }

    /// Add the next trial. Indices must arrive in ascending order.
    ///
    /// Dropped outcomes are recorded and logged. An `Err` means an internal
    /// contract was broken for this trial; the trial is recorded as dropped
    /// (unless its index was out of order) and the scan stays usable.
    pub fn push(&mut self, index: u32, outcome: TrialOutcome) -> AnalysisResult<()> {
        if let Some(last) = self.last_index {
            if index <= last {
                return Err(AnalysisError::InvariantViolation(format!(
                    "trial {} pushed after trial {}",
                    index, last
                )));
            }
        }
        self.last_index = Some(index);

        let trial = match outcome {
            TrialOutcome::Valid(trial) => trial,
            TrialOutcome::Dropped(reason) => {
                warn!(trial = index, %reason, "ignoring trial");
                self.dropped.push(DroppedTrial { index, reason });
                return Ok(());
            }
        };

        let kind = TrialKind::classify(index, self.probe_interval);
        let derived = MetricEngine::derive(&trial, kind).and_then(|metrics| {
            let aligned = align_to_last_tone(&trial).map_err(|e| {
                AnalysisError::InvariantViolation(format!(
                    "validated trial {} failed alignment: {}",
                    index, e
                ))
            })?;
            Ok((metrics, aligned))
        });
        let (metrics, aligned) = match derived {
            Ok(pair) => pair,
            Err(e) => {
                self.dropped.push(DroppedTrial {
                    index,
                    reason: DropReason::Internal {
                        message: e.to_string(),
                    },
                });
                return Err(e);
            }
        };

        debug!(trial = index, area = metrics.area_under_curve, ?kind, "trial accepted");
        self.metrics.push(metrics);
        match kind {
            TrialKind::Probe => {
                info!(trial = index, "probe trial");
                self.probes.push(aligned);
            }
            TrialKind::Regular => self.regular.push(aligned),
        }
        Ok(())
    }

    /// Resample both sets and build the summary
    pub fn finalize(self) -> AnalysisResult<DirectorySummary> {
        if self.metrics.is_empty() {
            return Err(AnalysisError::NoUsableTrials {
                dropped: self.dropped.len(),
            });
        }

        let mut bounds = DirectoryBounds::default();
        let regular = resample_group(&self.resampler, &self.regular, "regular", &mut bounds);
        let probes = resample_group(&self.resampler, &self.probes, "probe", &mut bounds);

        let areas: Vec<f64> = self.metrics.iter().map(|m| m.area_under_curve).collect();
        let histogram = MetricHistogram::from_values(&areas, self.histogram_bins);

        info!(
            valid = self.metrics.len(),
            regular = regular.len(),
            probes = probes.len(),
            dropped = self.dropped.len(),
            "directory summary ready"
        );

        Ok(DirectorySummary {
            grand_average: grand_average(&regular),
            regular_matrix: IntensityMatrix::from_set(&regular),
            probe_matrix: IntensityMatrix::from_set(&probes),
            metrics: self.metrics,
            dropped: self.dropped,
            regular,
            probes,
            bounds,
            histogram,
        })
    }
}

fn resample_group(
    resampler: &Resampler,
    trials: &[Trial],
    label: &str,
    bounds: &mut DirectoryBounds,
) -> ResampledSet {
    if trials.is_empty() {
        debug!(set = label, "no trials to resample");
        return ResampledSet::default();
    }
    match resampler.resample_set(trials) {
        Ok(set) => {
            if let Some(window) = set.window {
                bounds.fold(window);
            }
            set
        }
        Err(e) => {
            warn!(set = label, error = %e, "could not resample trial set");
            ResampledSet::default()
        }
    }
}
