//! Subject-level aggregation
//!
//! Groups per-session metric vectors by subject to build performance curves
//! across sessions. Session directories are named
//! `MouseS<subject>_SessionType<type>_Session<number>`.

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::metrics_file::read_metric_vector;
use crate::pipeline::{walk_tree, DEFAULT_OUTPUT_DIR};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SUBJECT_TAG: &str = "MouseS";
const TYPE_TAG: &str = "_SessionType";
const NUMBER_TAG: &str = "_Session";

/// Identity fields encoded in a session directory name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub subject: String,
    pub session_type: u32,
    pub session_number: u32,
}

impl SessionId {
    /// Find the leftmost session pattern anywhere in `path`
    pub fn parse(path: &Path) -> Option<Self> {
        Self::parse_str(&path.to_string_lossy())
    }

    pub fn parse_str(text: &str) -> Option<Self> {
        text.match_indices(SUBJECT_TAG)
            .find_map(|(pos, _)| Self::parse_at(&text[pos + SUBJECT_TAG.len()..]))
    }

    fn parse_at(rest: &str) -> Option<Self> {
        let (subject, rest) = split_digits(rest)?;
        let rest = rest.strip_prefix(TYPE_TAG)?;
        let (session_type, rest) = split_digits(rest)?;
        let rest = rest.strip_prefix(NUMBER_TAG)?;
        let (session_number, _) = split_digits(rest)?;
        Some(Self {
            subject: subject.to_string(),
            session_type: session_type.parse().ok()?,
            session_number: session_number.parse().ok()?,
        })
    }
}

fn split_digits(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    (end > 0).then(|| text.split_at(end))
}

/// Five-number summary of one session's metric distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl SessionStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        Some(Self {
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// One session's metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_number: u32,
    pub session_type: u32,
    pub metrics: Vec<f64>,
    pub stats: Option<SessionStats>,
}

impl SessionRecord {
    pub fn new(session_number: u32, session_type: u32, metrics: Vec<f64>) -> Self {
        Self {
            session_number,
            session_type,
            stats: SessionStats::from_values(&metrics),
            metrics,
        }
    }
}

/// All sessions of one subject, ordered by (session number, session type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject: String,
    pub sessions: Vec<SessionRecord>,
}

impl SubjectRecord {
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Accumulates session metrics across a directory tree
#[derive(Debug)]
pub struct SubjectAggregator {
    metric_file: String,
    subjects: BTreeMap<String, Vec<SessionRecord>>,
    skipped: Vec<PathBuf>,
}

impl Default for SubjectAggregator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl SubjectAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            metric_file: config.metric_file.clone(),
            subjects: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Record a session whose metrics are already loaded
    pub fn add_session(&mut self, id: SessionId, metrics: Vec<f64>) {
        debug!(subject = %id.subject, session = id.session_number, values = metrics.len(), "session added");
        self.subjects
            .entry(id.subject)
            .or_default()
            .push(SessionRecord::new(id.session_number, id.session_type, metrics));
    }

    /// Session directories that had no readable metric file
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Walk `root` in sorted order and load every session directory's metrics.
    ///
    /// A session directory is one whose own name carries the session pattern.
    /// Its metric file is looked up in the directory, then in its output
    /// sub-directory. Symlinked directories are not followed.
    pub fn scan(&mut self, root: &Path) -> AnalysisResult<()> {
        info!(dir = %root.display(), "scanning sessions");

        for (dir, _) in walk_tree(root)? {
            let id = dir
                .file_name()
                .and_then(|name| SessionId::parse_str(&name.to_string_lossy()));
            if let Some(id) = id {
                self.load_session(&dir, id);
            }
        }
        Ok(())
    }

    fn load_session(&mut self, dir: &Path, id: SessionId) {
        let candidates = [
            dir.join(&self.metric_file),
            dir.join(DEFAULT_OUTPUT_DIR).join(&self.metric_file),
        ];
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            warn!(dir = %dir.display(), file = %self.metric_file, "session has no metric file");
            self.skipped.push(dir.to_path_buf());
            return;
        };

        match read_metric_vector(path) {
            Ok(metrics) => self.add_session(id, metrics),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping session");
                self.skipped.push(dir.to_path_buf());
            }
        }
    }

    /// Subjects sorted by id (numerically when possible)
    pub fn finalize(self) -> Vec<SubjectRecord> {
        let mut records: Vec<SubjectRecord> = self
            .subjects
            .into_iter()
            .map(|(subject, mut sessions)| {
                sessions.sort_by_key(|s| (s.session_number, s.session_type));
                info!(subject = %subject, sessions = sessions.len(), "subject ready");
                SubjectRecord { subject, sessions }
            })
            .collect();
        records.sort_by(|a, b| compare_subjects(&a.subject, &b.subject));
        records
    }
}

fn compare_subjects(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_file;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn id(subject: &str, session_type: u32, session_number: u32) -> SessionId {
        SessionId {
            subject: subject.to_string(),
            session_type,
            session_number,
        }
    }

    #[test]
    fn test_parse_session_id() {
        let parsed = SessionId::parse(Path::new("/data/MouseS7_SessionType1_Session12/_plots"));
        assert_eq!(parsed, Some(id("7", 1, 12)));
    }

    #[test]
    fn test_parse_takes_leftmost_match() {
        let parsed = SessionId::parse_str("MouseS_x/MouseS3_SessionType2_Session1/MouseS9_SessionType1_Session1");
        assert_eq!(parsed, Some(id("3", 2, 1)));
    }

    #[test]
    fn test_parse_rejects_partial_names() {
        assert_eq!(SessionId::parse_str("MouseS7_SessionType1"), None);
        assert_eq!(SessionId::parse_str("MouseS7_Session1"), None);
        assert_eq!(SessionId::parse_str("/data/session"), None);
    }

    #[test]
    fn test_grouping_by_subject() {
        let mut agg = SubjectAggregator::new(&AnalysisConfig::default());
        agg.add_session(id("7", 1, 2), vec![2.0]);
        agg.add_session(id("3", 2, 1), vec![3.0]);
        agg.add_session(id("7", 1, 1), vec![1.0]);

        let records = agg.finalize();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "3");
        assert_eq!(records[0].session_count(), 1);
        assert_eq!(records[1].subject, "7");
        assert_eq!(records[1].session_count(), 2);
        let numbers: Vec<_> = records[1].sessions.iter().map(|s| s.session_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_sessions_ordered_by_number_then_type() {
        let mut agg = SubjectAggregator::default();
        agg.add_session(id("1", 2, 1), vec![]);
        agg.add_session(id("1", 1, 2), vec![]);
        agg.add_session(id("1", 1, 1), vec![]);

        let order: Vec<_> = agg.finalize()[0]
            .sessions
            .iter()
            .map(|s| (s.session_number, s.session_type))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_numeric_subject_order() {
        let mut agg = SubjectAggregator::default();
        agg.add_session(id("10", 1, 1), vec![]);
        agg.add_session(id("9", 1, 1), vec![]);
        let subjects: Vec<_> = agg.finalize().into_iter().map(|r| r.subject).collect();
        assert_eq!(subjects, vec!["9", "10"]);
    }

    #[test]
    fn test_five_number_summary() {
        let stats = SessionStats::from_values(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(
            stats,
            SessionStats {
                min: 1.0,
                q1: 2.0,
                median: 3.0,
                q3: 4.0,
                max: 5.0
            }
        );

        let even = SessionStats::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(even.median, 2.5);
        assert_eq!(even.q1, 1.75);
        assert!(SessionStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_scan_tree() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "MouseS7_SessionType1_Session1/area_under_curve.csv", "1.0\n2.0\n");
        write_file(dir.path(), "MouseS7_SessionType1_Session2/_plots/area_under_curve.csv", "3.0\n");
        write_file(dir.path(), "batch/MouseS3_SessionType2_Session1/area_under_curve.csv", "4.0 5.0\n");
        // Missing and malformed files are skipped
        write_file(dir.path(), "MouseS3_SessionType2_Session2/Trial1.csv", "x");
        write_file(dir.path(), "MouseS3_SessionType2_Session3/area_under_curve.csv", "oops\n");

        let mut agg = SubjectAggregator::new(&AnalysisConfig::default());
        agg.scan(dir.path()).unwrap();
        assert_eq!(agg.skipped().len(), 2);

        let records = agg.finalize();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "3");
        assert_eq!(records[0].sessions[0].metrics, vec![4.0, 5.0]);
        assert_eq!(records[1].subject, "7");
        assert_eq!(records[1].sessions.len(), 2);
        assert_eq!(records[1].sessions[1].metrics, vec![3.0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_counts_session_once() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "MouseS7_SessionType1_Session1/area_under_curve.csv", "1.0\n");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(
            dir.path(),
            dir.path().join("MouseS7_SessionType1_Session1/back"),
        )
        .unwrap();

        let mut agg = SubjectAggregator::default();
        agg.scan(dir.path()).unwrap();
        let records = agg.finalize();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_count(), 1);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempdir().unwrap();
        let mut agg = SubjectAggregator::default();
        assert!(agg.scan(&dir.path().join("absent")).is_err());
    }
}
