//! Shared fixtures for unit tests

use crate::types::{Phase, Sample, Trial};
use std::fs;
use std::path::{Path, PathBuf};

/// Render rows as a rig recording with the standard five header lines
pub fn render_csv(rows: &[(f64, f64, &str)]) -> String {
    let mut text = String::from(
        "# rig: bench-2\n# mouse: test\n# session: 1\n# columns: 8\n\
         time,sensor,trial_count,tone,puff,led,status,imaging\n",
    );
    for (time, sensor, status) in rows {
        let tone = u8::from(*status == "TONE");
        let puff = u8::from(*status == "PUFF");
        text.push_str(&format!(
            "{},{},1,{},{},0,{},0\n",
            time, sensor, tone, puff, status
        ));
    }
    text
}

/// Build a trial directly from (time, sensor, phase) triples
pub fn trial_from(index: u32, rows: &[(f64, f64, Phase)]) -> Trial {
    Trial::new(
        index,
        rows.iter()
            .map(|(t, s, p)| Sample::new(*t, *s, p.clone()))
            .collect(),
    )
}

/// Rows for a realistic trial sampled every 10 ms up to `end_ms`.
///
/// PRE until 5000 ms, TONE until 5350 ms, TRACE until 5600 ms, then an
/// optional 50 ms PUFF and POST for the remainder.
pub fn synthetic_rows(end_ms: f64, level: f64, with_puff: bool) -> Vec<(f64, f64, &'static str)> {
    let mut rows = Vec::new();
    let mut t = 0.0;
    while t <= end_ms {
        let status = if t < 5000.0 {
            "PRE_"
        } else if t < 5350.0 {
            "TONE"
        } else if t < 5600.0 {
            "TRAC"
        } else if with_puff && t < 5650.0 {
            "PUFF"
        } else {
            "POST"
        };
        let sensor = match status {
            "PRE_" => level,
            "TONE" | "TRAC" => level + 20.0,
            _ => level + 5.0,
        };
        rows.push((t, sensor, status));
        t += 10.0;
    }
    rows
}

/// Write a file relative to `dir`, creating parent directories
pub fn write_file(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}
