//! Column descriptor for trial recordings

use crate::config::{AnalysisConfig, DEFAULT_HEADER_LINES};
use crate::error::{AnalysisError, AnalysisResult};
use serde::Serialize;

pub const COLUMN_TIME: &str = "time";
pub const COLUMN_SENSOR: &str = "sensor";
pub const COLUMN_TRIAL_COUNT: &str = "trial_count";
pub const COLUMN_TONE: &str = "tone";
pub const COLUMN_PUFF: &str = "puff";
pub const COLUMN_LED: &str = "led";
pub const COLUMN_STATUS: &str = "status";
pub const COLUMN_IMAGING: &str = "imaging";

/// A named column and whether the analysis needs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub required: bool,
}

impl ColumnSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Column order written by the rig
pub const TRIAL_COLUMNS: [ColumnSpec; 8] = [
    ColumnSpec::required(COLUMN_TIME),
    ColumnSpec::required(COLUMN_SENSOR),
    ColumnSpec::optional(COLUMN_TRIAL_COUNT),
    ColumnSpec::optional(COLUMN_TONE),
    ColumnSpec::optional(COLUMN_PUFF),
    ColumnSpec::optional(COLUMN_LED),
    ColumnSpec::required(COLUMN_STATUS),
    ColumnSpec::optional(COLUMN_IMAGING),
];

/// Layout of a trial file: columns, header lines and comment marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSchema {
    columns: Vec<ColumnSpec>,
    header_lines: usize,
    comment_prefix: String,
}

impl Default for TrialSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl TrialSchema {
    /// The rig's standard eight-column layout
    pub fn standard() -> Self {
        Self {
            columns: TRIAL_COLUMNS.to_vec(),
            header_lines: DEFAULT_HEADER_LINES,
            comment_prefix: "#".to_string(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            columns: TRIAL_COLUMNS.to_vec(),
            header_lines: config.header_lines,
            comment_prefix: config.comment_prefix.clone(),
        }
    }

    /// Build a custom layout; every required analysis column must be present
    pub fn new(
        columns: Vec<ColumnSpec>,
        header_lines: usize,
        comment_prefix: impl Into<String>,
    ) -> AnalysisResult<Self> {
        let schema = Self {
            columns,
            header_lines,
            comment_prefix: comment_prefix.into(),
        };
        for name in [COLUMN_TIME, COLUMN_SENSOR, COLUMN_STATUS] {
            match schema.columns.iter().find(|c| c.name == name) {
                Some(col) if col.required => {}
                Some(_) => {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "column '{}' must be required",
                        name
                    )))
                }
                None => {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "schema has no '{}' column",
                        name
                    )))
                }
            }
        }
        Ok(schema)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    pub fn comment_prefix(&self) -> &str {
        &self.comment_prefix
    }

    /// Position of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Minimum number of fields a row needs to cover every required column
    pub fn required_width(&self) -> usize {
        self.columns
            .iter()
            .rposition(|c| c.required)
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    /// Remove comments and surrounding whitespace; `None` for non-data lines
    pub fn strip_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        let data = if self.comment_prefix.is_empty() {
            line
        } else {
            line.split(self.comment_prefix.as_str()).next().unwrap_or("")
        };
        let data = data.trim();
        (!data.is_empty()).then_some(data)
    }

    /// Check that a row carries every required column
    pub fn validate_row(&self, line: usize, fields: &[&str]) -> AnalysisResult<()> {
        let width = self.required_width();
        if fields.len() < width {
            return Err(AnalysisError::SchemaError {
                line,
                message: format!("expected at least {} columns, got {}", width, fields.len()),
            });
        }
        for (spec, field) in self.columns.iter().zip(fields) {
            if spec.required && field.trim().is_empty() {
                return Err(AnalysisError::SchemaError {
                    line,
                    message: format!("required column '{}' is empty", spec.name),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let schema = TrialSchema::standard();
        assert_eq!(schema.position(COLUMN_TIME), Some(0));
        assert_eq!(schema.position(COLUMN_STATUS), Some(6));
        assert_eq!(schema.required_width(), 7);
        assert_eq!(schema.header_lines(), 5);
    }

    #[test]
    fn test_strip_line() {
        let schema = TrialSchema::standard();
        assert_eq!(schema.strip_line("# comment"), None);
        assert_eq!(schema.strip_line("   "), None);
        assert_eq!(schema.strip_line("1,2 # note"), Some("1,2"));
    }

    #[test]
    fn test_validate_row_width() {
        let schema = TrialSchema::standard();
        let err = schema.validate_row(9, &["1", "2", "3"]).unwrap_err();
        match err {
            AnalysisError::SchemaError { line, message } => {
                assert_eq!(line, 9);
                assert!(message.contains("at least 7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_row_empty_required() {
        let schema = TrialSchema::standard();
        let fields = ["1", "2", "0", "0", "0", "0", " ", "0"];
        assert!(matches!(
            schema.validate_row(1, &fields),
            Err(AnalysisError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_custom_schema_requires_analysis_columns() {
        let columns = vec![
            ColumnSpec::required(COLUMN_TIME),
            ColumnSpec::required(COLUMN_SENSOR),
        ];
        assert!(TrialSchema::new(columns, 0, "#").is_err());

        let columns = vec![
            ColumnSpec::required(COLUMN_TIME),
            ColumnSpec::optional(COLUMN_SENSOR),
            ColumnSpec::required(COLUMN_STATUS),
        ];
        assert!(TrialSchema::new(columns, 0, "#").is_err());
    }
}
