//! Core types for the Blink Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: parsed samples and trials, per-trial metrics, and aligned series.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Experimental phase attached to every sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    /// Pre-stimulus baseline
    Pre,
    /// Conditioned-stimulus tone
    Tone,
    /// Trace interval between tone and puff
    Trace,
    /// Unconditioned-stimulus air puff
    Puff,
    /// Post-trial period
    Post,
    /// Any other label written by the recording rig (e.g. `CS_P`, `DIST`)
    #[serde(untagged)]
    Other(String),
}

impl Phase {
    /// Map a raw status label from a recording to a phase
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "PRE_" | "PRE" => Phase::Pre,
            "TONE" => Phase::Tone,
            "TRAC" | "TRACE" => Phase::Trace,
            "PUFF" => Phase::Puff,
            "POST" => Phase::Post,
            other => Phase::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Pre => "PRE",
            Phase::Tone => "TONE",
            Phase::Trace => "TRACE",
            Phase::Puff => "PUFF",
            Phase::Post => "POST",
            Phase::Other(label) => label.as_str(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary rig channels carried through unused by the analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channels {
    pub trial_count: Option<f64>,
    pub tone: Option<f64>,
    pub puff: Option<f64>,
    pub led: Option<f64>,
    pub imaging: Option<f64>,
}

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time since trial start (ms)
    pub time: f64,
    /// Raw sensor readout
    pub sensor: f64,
    /// Phase label
    pub phase: Phase,
    /// Pass-through channels
    #[serde(default)]
    pub channels: Channels,
}

impl Sample {
    pub fn new(time: f64, sensor: f64, phase: Phase) -> Self {
        Self {
            time,
            sensor,
            phase,
            channels: Channels::default(),
        }
    }
}

/// Span of samples carrying one phase label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub phase: Phase,
    /// Index of the first sample with this phase
    pub first: usize,
    /// Index of the last sample with this phase
    pub last: usize,
    /// Number of samples with this phase
    pub count: usize,
    pub start_time: f64,
    pub end_time: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Trial classification within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    /// Tone followed by puff
    Regular,
    /// Every Nth trial, analyzed separately
    Probe,
}

impl TrialKind {
    /// Classify a trial by its index: every `probe_interval`-th trial is a probe
    pub fn classify(index: u32, probe_interval: u32) -> Self {
        if probe_interval != 0 && index % probe_interval == 0 {
            TrialKind::Probe
        } else {
            TrialKind::Regular
        }
    }
}

/// A parsed trial recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Trial index within its session directory
    pub index: u32,
    /// Samples ordered by time
    pub samples: Vec<Sample>,
}

impl Trial {
    pub fn new(index: u32, samples: Vec<Sample>) -> Self {
        Self { index, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over samples carrying the given phase, in recording order
    pub fn phase_samples<'a>(&'a self, phase: &'a Phase) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |s| &s.phase == phase)
    }

    pub fn has_phase(&self, phase: &Phase) -> bool {
        self.samples.iter().any(|s| &s.phase == phase)
    }

    /// Locate the samples with the given phase, if any
    pub fn segment(&self, phase: &Phase) -> Option<Segment> {
        let mut found: Option<Segment> = None;
        for (i, sample) in self.samples.iter().enumerate() {
            if &sample.phase != phase {
                continue;
            }
            match found.as_mut() {
                Some(seg) => {
                    seg.last = i;
                    seg.count += 1;
                    seg.end_time = sample.time;
                }
                None => {
                    found = Some(Segment {
                        phase: phase.clone(),
                        first: i,
                        last: i,
                        count: 1,
                        start_time: sample.time,
                        end_time: sample.time,
                    });
                }
            }
        }
        found
    }

    /// Puff segment; probe trials usually have none
    pub fn puff_segment(&self) -> Option<Segment> {
        self.segment(&Phase::Puff)
    }

    /// Timestamp of the last tone sample
    pub fn last_tone_time(&self) -> Option<f64> {
        self.samples
            .iter()
            .rev()
            .find(|s| s.phase == Phase::Tone)
            .map(|s| s.time)
    }

    /// Observed (min, max) timestamps
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?.time;
        Some(self.samples.iter().fold((first, first), |(lo, hi), s| {
            (lo.min(s.time), hi.max(s.time))
        }))
    }

    pub fn max_time(&self) -> Option<f64> {
        self.time_range().map(|(_, hi)| hi)
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn sensor_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.sensor).collect()
    }
}

/// Why a trial was excluded from aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DropReason {
    /// Parsed row count at or below the parser minimum
    TooFewRows { rows: usize, min: usize },
    /// Sample count not above the validity minimum
    TooFewSamples { samples: usize, min: usize },
    /// Recording ended before the minimum trial time
    TooShort { max_time_ms: f64, min_ms: f64 },
    /// A required phase is absent
    MissingPhase { phase: Phase },
    /// File could not be read or violated the schema
    Malformed { message: String },
    /// Processing hit an internal invariant violation
    Internal { message: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::TooFewRows { rows, min } => {
                write!(f, "only {} rows (need more than {})", rows, min)
            }
            DropReason::TooFewSamples { samples, min } => {
                write!(f, "only {} samples (need more than {})", samples, min)
            }
            DropReason::TooShort { max_time_ms, min_ms } => {
                write!(f, "ends at {} ms (need at least {} ms)", max_time_ms, min_ms)
            }
            DropReason::MissingPhase { phase } => write!(f, "no {} samples", phase),
            DropReason::Malformed { message } => write!(f, "malformed: {}", message),
            DropReason::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

/// Result of loading and validating one trial file
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Valid(Trial),
    Dropped(DropReason),
}

impl TrialOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, TrialOutcome::Valid(_))
    }
}

/// Per-trial metrics computed once by the metric engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMetrics {
    pub index: u32,
    pub kind: TrialKind,
    /// Mean sensor value over the PRE phase
    pub baseline: f64,
    /// Area contributed by the TONE phase
    pub tone_area: f64,
    /// Area contributed by the TRACE phase
    pub trace_area: f64,
    /// TONE + TRACE area
    pub area_under_curve: f64,
    /// Whether the trial recorded a puff
    pub has_puff: bool,
}

/// Resampled sensor trace on a uniform time grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub time_grid: Vec<f64>,
    pub values: Vec<f64>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Closed time window shared by a set of trials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub tmin: f64,
    pub tmax: f64,
}

impl TimeWindow {
    pub fn span(&self) -> f64 {
        self.tmax - self.tmin
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.tmin && t <= self.tmax
    }
}

/// Deviation of resampled statistics from the original series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub mean_error: f64,
    pub std_error: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, sensor: f64, phase: Phase) -> Sample {
        Sample::new(time, sensor, phase)
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(Phase::from_label("PRE_"), Phase::Pre);
        assert_eq!(Phase::from_label(" TRAC "), Phase::Trace);
        assert_eq!(Phase::from_label("PUFF"), Phase::Puff);
        assert_eq!(Phase::from_label("CS_P"), Phase::Other("CS_P".to_string()));
        assert_eq!(Phase::Trace.to_string(), "TRACE");
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&Phase::Tone).unwrap();
        assert_eq!(json, "\"TONE\"");
        let other: Phase = serde_json::from_str("\"DIST\"").unwrap();
        assert_eq!(other, Phase::Other("DIST".to_string()));
    }

    #[test]
    fn test_classify_probe_every_tenth() {
        assert_eq!(TrialKind::classify(10, 10), TrialKind::Probe);
        assert_eq!(TrialKind::classify(20, 10), TrialKind::Probe);
        assert_eq!(TrialKind::classify(11, 10), TrialKind::Regular);
        assert_eq!(TrialKind::classify(5, 0), TrialKind::Regular);
    }

    #[test]
    fn test_segments_and_puff() {
        let trial = Trial::new(
            1,
            vec![
                sample(0.0, 1.0, Phase::Pre),
                sample(10.0, 1.0, Phase::Tone),
                sample(20.0, 1.0, Phase::Tone),
                sample(30.0, 1.0, Phase::Trace),
                sample(40.0, 1.0, Phase::Puff),
                sample(50.0, 1.0, Phase::Post),
            ],
        );

        let tone = trial.segment(&Phase::Tone).unwrap();
        assert_eq!((tone.first, tone.last, tone.count), (1, 2, 2));
        assert_eq!(tone.duration(), 10.0);
        assert!(trial.puff_segment().is_some());
        assert_eq!(trial.last_tone_time(), Some(20.0));
        assert_eq!(trial.time_range(), Some((0.0, 50.0)));

        let probe = Trial::new(10, trial.samples[..4].to_vec());
        assert!(probe.puff_segment().is_none());
    }

    #[test]
    fn test_empty_trial_has_no_range() {
        let trial = Trial::new(3, Vec::new());
        assert!(trial.time_range().is_none());
        assert!(trial.last_tone_time().is_none());
    }
}
