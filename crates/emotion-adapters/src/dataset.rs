//! Filesystem adapter for CSV landmark tables.

use anyhow::{bail, Context, Result};
use emotion_core::{DatasetSource, RawTable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default name of the label column.
pub const DEFAULT_LABEL_COLUMN: &str = "Expression";

/// Columns ignored by default.
pub const DEFAULT_EXCLUDE_COLUMNS: &[&str] = &["FileName"];

/// CSV dataset source adapter.
///
/// The first record is the header. One column holds the emotion label,
/// excluded columns are skipped, and every remaining column is a feature.
pub struct CsvDatasetSource {
    path: PathBuf,
    label_column: String,
    exclude_columns: Vec<String>,
}

impl CsvDatasetSource {
    /// Creates a source with the default label and excluded columns.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            exclude_columns: DEFAULT_EXCLUDE_COLUMNS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Sets the label column name.
    #[must_use]
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    /// Replaces the excluded column names.
    #[must_use]
    pub fn with_exclude_columns(mut self, columns: Vec<String>) -> Self {
        self.exclude_columns = columns;
        self
    }

    /// Path of the CSV file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses CSV text into a raw table.
    ///
    /// # Errors
    ///
    /// Returns an error if the header lacks the label column, a record has
    /// the wrong number of fields, or the text is not valid CSV.
    pub fn parse(&self, text: &str) -> Result<RawTable> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if header.iter().all(String::is_empty) {
            bail!("CSV has no header row");
        }

        let label_index = header
            .iter()
            .position(|h| *h == self.label_column)
            .with_context(|| {
                format!(
                    "Label column '{}' not found (columns: {})",
                    self.label_column,
                    header.join(", ")
                )
            })?;

        let feature_indices: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(i, name)| *i != label_index && !self.exclude_columns.contains(*name))
            .map(|(i, _)| i)
            .collect();
        let feature_names = feature_indices.iter().map(|&i| header[i].clone()).collect();

        let mut table = RawTable::new(feature_names);
        let mut unparsable = 0usize;

        for (n, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read record {}", n + 1))?;
            if record.len() != header.len() {
                bail!(
                    "record {} has {} fields, expected {}",
                    n + 1,
                    record.len(),
                    header.len()
                );
            }

            let features = feature_indices
                .iter()
                .map(|&i| {
                    let (value, ok) = parse_feature(&record[i]);
                    if !ok {
                        unparsable += 1;
                    }
                    value
                })
                .collect();
            table.push(features, parse_label(&record[label_index]));
        }

        if unparsable > 0 {
            warn!("{unparsable} feature cells could not be parsed and were treated as missing");
        }
        debug!(
            "Parsed {} rows x {} features ({} labeled)",
            table.len(),
            table.width(),
            table.labeled_count()
        );
        Ok(table)
    }
}

impl DatasetSource for CsvDatasetSource {
    fn load(&self) -> Result<RawTable> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read dataset: {}", self.path.display()))?;
        let table = self
            .parse(&text)
            .with_context(|| format!("Failed to parse dataset: {}", self.path.display()))?;
        info!(
            "Loaded {} rows x {} features from {}",
            table.len(),
            table.width(),
            self.path.display()
        );
        Ok(table)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parses a feature cell. Empty and `nan` cells are missing (NaN); the flag
/// is false only for text that is not a number at all.
fn parse_feature(cell: &str) -> (f32, bool) {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return (f32::NAN, true);
    }
    cell.parse::<f32>().map_or((f32::NAN, false), |v| (v, true))
}

fn parse_label(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stray_quote_in_unquoted_cell() {
        let table = CsvDatasetSource::new("unused.csv")
            .parse("FileName,f0,Expression\nimg\"1.png,0.5,happy\nimg2.png,0.7,sad\n")
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.feature_names, vec!["f0"]);
        assert_eq!(table.rows[0].features, vec![0.5]);
        assert_eq!(table.rows[1].label.as_deref(), Some("sad"));
    }

    #[test]
    fn test_quoted_fields_and_crlf() {
        let table = CsvDatasetSource::new("unused.csv")
            .parse("FileName,x,Expression\r\n\"a,b.png\",1.5,\"say \"\"hi\"\"\"\r\n")
            .unwrap();
        assert_eq!(table.rows[0].features, vec![1.5]);
        assert_eq!(table.rows[0].label.as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn test_blank_lines_and_missing_trailing_newline() {
        let table = CsvDatasetSource::new("unused.csv")
            .parse("x,Expression\n1,happy\n\n2,sad")
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].features, vec![2.0]);
    }

    #[test]
    fn test_empty_text_has_no_header() {
        let err = CsvDatasetSource::new("unused.csv").parse("").unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }

    #[test]
    fn test_parse_feature() {
        assert_eq!(parse_feature(" 1.5 "), (1.5, true));
        assert!(parse_feature("").0.is_nan());
        assert!(parse_feature("NaN").1);
        let (value, ok) = parse_feature("abc");
        assert!(value.is_nan());
        assert!(!ok);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label(" happy "), Some("happy".to_string()));
        assert_eq!(parse_label("nan"), None);
        assert_eq!(parse_label(""), None);
    }
}
