//! Trial file parser
//!
//! Reads a rig recording into a [`Trial`]. Recordings with too few rows are
//! reported as absent (`Ok(None)`) rather than as errors.

use crate::config::{AnalysisConfig, DEFAULT_MIN_ROWS};
use crate::error::{AnalysisError, AnalysisResult};
use crate::schema::columns::*;
use crate::types::{Channels, Phase, Sample, Trial};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Outcome of reading one trial file
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTrial {
    Trial(Trial),
    /// Data rows at or below the parser minimum
    TooFewRows { rows: usize },
}

impl ParsedTrial {
    pub fn into_trial(self) -> Option<Trial> {
        match self {
            ParsedTrial::Trial(trial) => Some(trial),
            ParsedTrial::TooFewRows { .. } => None,
        }
    }
}

/// Parser bound to a schema and a minimum row count
#[derive(Debug, Clone)]
pub struct TrialParser {
    schema: TrialSchema,
    min_rows: usize,
    time_col: usize,
    sensor_col: usize,
    status_col: usize,
    channel_cols: [Option<usize>; 5],
}

impl Default for TrialParser {
    fn default() -> Self {
        Self::new(TrialSchema::standard(), DEFAULT_MIN_ROWS)
    }
}

impl TrialParser {
    pub fn new(schema: TrialSchema, min_rows: usize) -> Self {
        // TrialSchema::new and ::standard guarantee these columns exist
        let time_col = schema.position(COLUMN_TIME).unwrap_or(0);
        let sensor_col = schema.position(COLUMN_SENSOR).unwrap_or(1);
        let status_col = schema.position(COLUMN_STATUS).unwrap_or(6);
        let channel_cols = [
            schema.position(COLUMN_TRIAL_COUNT),
            schema.position(COLUMN_TONE),
            schema.position(COLUMN_PUFF),
            schema.position(COLUMN_LED),
            schema.position(COLUMN_IMAGING),
        ];
        Self {
            schema,
            min_rows,
            time_col,
            sensor_col,
            status_col,
            channel_cols,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(TrialSchema::from_config(config), config.min_rows)
    }

    pub fn schema(&self) -> &TrialSchema {
        &self.schema
    }

    /// Parse a trial file from disk
    pub fn parse_file(&self, index: u32, path: &Path) -> AnalysisResult<Option<Trial>> {
        Ok(self.read_file(index, path)?.into_trial())
    }

    /// Parse trial text. Returns `Ok(None)` when the row count is at or below
    /// the configured minimum.
    pub fn parse_str(&self, index: u32, text: &str) -> AnalysisResult<Option<Trial>> {
        Ok(self.read_str(index, text)?.into_trial())
    }

    /// Like [`parse_file`](Self::parse_file), keeping the row count of a
    /// too-short file
    pub fn read_file(&self, index: u32, path: &Path) -> AnalysisResult<ParsedTrial> {
        debug!(path = %path.display(), index, "reading trial");
        let text = fs::read_to_string(path)?;
        self.read_str(index, &text)
    }

    pub fn read_str(&self, index: u32, text: &str) -> AnalysisResult<ParsedTrial> {
        let mut samples = Vec::new();

        for (line_idx, raw) in text.lines().enumerate().skip(self.schema.header_lines()) {
            let line_num = line_idx + 1;
            let Some(line) = self.schema.strip_line(raw) else {
                continue;
            };
            let fields: Vec<&str> = line.split(',').collect();
            self.schema.validate_row(line_num, &fields)?;
            samples.push(self.parse_row(line_num, &fields)?);
        }

        if samples.len() <= self.min_rows {
            debug!(index, rows = samples.len(), "few or no entries in this trial");
            return Ok(ParsedTrial::TooFewRows {
                rows: samples.len(),
            });
        }

        Ok(ParsedTrial::Trial(Trial::new(index, samples)))
    }

    fn parse_row(&self, line: usize, fields: &[&str]) -> AnalysisResult<Sample> {
        let time = parse_required(line, COLUMN_TIME, fields[self.time_col])?;
        let sensor = parse_required(line, COLUMN_SENSOR, fields[self.sensor_col])?;
        let phase = Phase::from_label(fields[self.status_col]);

        let channel = |pos: Option<usize>| -> Option<f64> {
            pos.and_then(|p| fields.get(p))
                .and_then(|f| f.trim().parse::<f64>().ok())
        };
        let channels = Channels {
            trial_count: channel(self.channel_cols[0]),
            tone: channel(self.channel_cols[1]),
            puff: channel(self.channel_cols[2]),
            led: channel(self.channel_cols[3]),
            imaging: channel(self.channel_cols[4]),
        };

        Ok(Sample {
            time,
            sensor,
            phase,
            channels,
        })
    }
}

fn parse_required(line: usize, column: &'static str, raw: &str) -> AnalysisResult<f64> {
    let value = raw.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AnalysisError::InvalidValue {
            line,
            column,
            value: value.to_string(),
        })
}
