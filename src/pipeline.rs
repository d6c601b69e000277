//! Pipeline orchestration
//!
//! This module provides the public API for Blink Flux.
//! It wires trial discovery, parsing, validation and aggregation for one
//! session directory, and persists the results.

use crate::aggregate::{DirectoryScan, DirectorySummary, TrialValidator};
use crate::config::AnalysisConfig;
use crate::encoder::SummaryEncoder;
use crate::error::{AnalysisError, AnalysisResult};
use crate::features::MetricEngine;
use crate::metrics_file::write_metric_vector;
use crate::schema::{ParsedTrial, TrialParser};
use crate::types::{DropReason, TrialKind, TrialMetrics, TrialOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Default output sub-directory under the analyzed directory
pub const DEFAULT_OUTPUT_DIR: &str = "_plots";

/// Extract `N` from a path containing `Trial<N>.csv`
pub fn trial_index(path: &Path) -> Option<u32> {
    let text = path.to_string_lossy();
    text.match_indices("Trial").find_map(|(pos, _)| {
        let rest = &text[pos + "Trial".len()..];
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || !rest[digits..].starts_with(".csv") {
            return None;
        }
        rest[..digits].parse().ok()
    })
}

/// Directories under `root` in sorted pre-order, each with its sorted files.
///
/// Symlinked directories are listed by their parent but never entered.
/// A sub-directory that cannot be read is skipped with a warning; only a
/// failure to read `root` itself is an error.
pub fn walk_tree(root: &Path) -> AnalysisResult<Vec<(PathBuf, Vec<PathBuf>)>> {
    let mut visited = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match read_dir_sorted(&dir) {
            Ok(entries) => entries,
            Err(e) if dir.as_path() != root => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for (path, file_type) in entries {
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                files.push(path);
            }
        }
        // Visit sub-directories in sorted order
        pending.extend(subdirs.into_iter().rev());
        visited.push((dir, files));
    }

    Ok(visited)
}

fn read_dir_sorted(dir: &Path) -> io::Result<Vec<(PathBuf, fs::FileType)>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| {
            let entry = entry?;
            Ok((entry.path(), entry.file_type()?))
        })
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Walk `root` and map trial indices to files, in deterministic order.
/// A later path with the same index replaces an earlier one.
pub fn discover_trials(root: &Path) -> AnalysisResult<BTreeMap<u32, PathBuf>> {
    let mut trials = BTreeMap::new();

    for (_, files) in walk_tree(root)? {
        for path in files {
            if !path.extension().is_some_and(|ext| ext == "csv") {
                continue;
            }
            if let Some(index) = trial_index(&path) {
                if let Some(previous) = trials.insert(index, path.clone()) {
                    debug!(index, old = %previous.display(), new = %path.display(), "duplicate trial index");
                }
            }
        }
    }

    Ok(trials)
}

/// Metrics for a single trial file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrialReport {
    Analyzed(TrialMetrics),
    Dropped(DropReason),
}

/// Stateless processor for session directories
#[derive(Debug, Clone)]
pub struct TrialSetProcessor {
    config: AnalysisConfig,
    parser: TrialParser,
    validator: TrialValidator,
}

impl Default for TrialSetProcessor {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl TrialSetProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            parser: TrialParser::from_config(&config),
            validator: TrialValidator::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Parse and validate one trial file. I/O and schema failures become
    /// `Dropped(Malformed)`; they never abort a directory scan.
    pub fn load_trial(&self, index: u32, path: &Path) -> TrialOutcome {
        match self.parser.read_file(index, path) {
            Ok(ParsedTrial::Trial(trial)) => self.validator.validate(trial),
            Ok(ParsedTrial::TooFewRows { rows }) => TrialOutcome::Dropped(DropReason::TooFewRows {
                rows,
                min: self.config.min_rows,
            }),
            Err(e) => TrialOutcome::Dropped(DropReason::Malformed {
                message: e.to_string(),
            }),
        }
    }

    /// Analyze a single trial file. A file without a `Trial<N>.csv` name gets
    /// index 0 and is treated as a regular trial.
    pub fn analyze_trial(&self, path: &Path) -> AnalysisResult<TrialReport> {
        let index = trial_index(path);
        match self.load_trial(index.unwrap_or(0), path) {
            TrialOutcome::Valid(trial) => {
                let kind = index.map_or(TrialKind::Regular, |i| {
                    TrialKind::classify(i, self.config.probe_interval)
                });
                Ok(TrialReport::Analyzed(MetricEngine::derive(&trial, kind)?))
            }
            TrialOutcome::Dropped(reason) => Ok(TrialReport::Dropped(reason)),
        }
    }

    /// Analyze every trial under `root`
    pub fn analyze_directory(&self, root: &Path) -> AnalysisResult<DirectorySummary> {
        info!(dir = %root.display(), "searching for trials");
        let files = discover_trials(root)?;
        if files.is_empty() {
            warn!(dir = %root.display(), "no trial files found");
            return Err(AnalysisError::NoTrialFiles(root.to_path_buf()));
        }

        let mut scan = DirectoryScan::new(&self.config);
        for (&index, path) in &files {
            let outcome = self.load_trial(index, path);
            if let Err(e) = scan.push(index, outcome) {
                error!(trial = index, path = %path.display(), error = %e, "trial processing aborted");
            }
        }
        scan.finalize()
    }

    /// Persist the metric vector and the summary export under `out_dir`
    pub fn write_outputs(
        &self,
        summary: &DirectorySummary,
        source_dir: &Path,
        out_dir: &Path,
    ) -> AnalysisResult<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;

        let metric_path = out_dir.join(&self.config.metric_file);
        write_metric_vector(&metric_path, &summary.metric_vector())?;
        info!(path = %metric_path.display(), "area under the curve written");

        let summary_path = out_dir.join(&self.config.summary_file);
        let json = SummaryEncoder::new().encode_to_json(summary, source_dir)?;
        fs::write(&summary_path, json)?;
        info!(path = %summary_path.display(), "summary written");

        Ok(vec![metric_path, summary_path])
    }

    /// Analyze `root` and write outputs to `out_dir` (default `<root>/_plots`)
    pub fn run(&self, root: &Path, out_dir: Option<&Path>) -> AnalysisResult<DirectorySummary> {
        let out_dir = out_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(DEFAULT_OUTPUT_DIR));
        let summary = self.analyze_directory(root)?;
        self.write_outputs(&summary, root, &out_dir)?;
        Ok(summary)
    }
}
