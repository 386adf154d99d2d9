//! CSV loader for student exam records.
//!
//! The file has a header row followed by three columns in fixed order:
//! study hours, attendance percentage and a pass/fail boolean.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column names as they appear in the reference dataset, in positional order.
pub const COLUMN_NAMES: [&str; 3] = ["GodzinyNauki", "Frekwencja", "ZdalEgzamin"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {column} value {value:?}")]
    InvalidField {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("no data rows after the header")]
    Empty,
}

/// One student's study hours, attendance and exam outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub study_hours: f32,
    pub attendance: f32,
    pub passed: bool,
}

/// Load every record from a CSV file, preserving file order.
pub fn load_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(BufReader::new(file))?;
    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse records from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    tracing::debug!("CSV header: {:?}", headers.iter().collect::<Vec<_>>());

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = row?;
        // Header is line 1.
        let line = idx + 2;
        out.push(parse_row(&row, line)?);
    }
    if out.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(out)
}

fn parse_row(row: &StringRecord, line: usize) -> Result<Record, LoadError> {
    if row.len() != COLUMN_NAMES.len() {
        return Err(LoadError::ColumnCount {
            line,
            expected: COLUMN_NAMES.len(),
            found: row.len(),
        });
    }
    Ok(Record {
        study_hours: parse_f32(&row[0], line, COLUMN_NAMES[0])?,
        attendance: parse_f32(&row[1], line, COLUMN_NAMES[1])?,
        passed: parse_bool(&row[2], line, COLUMN_NAMES[2])?,
    })
}

fn parse_f32(raw: &str, line: usize, column: &'static str) -> Result<f32, LoadError> {
    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(raw, line, column)),
    }
}

fn parse_bool(raw: &str, line: usize, column: &'static str) -> Result<bool, LoadError> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Ok(false)
    } else {
        Err(invalid(raw, line, column))
    }
}

fn invalid(raw: &str, line: usize, column: &'static str) -> LoadError {
    LoadError::InvalidField {
        line,
        column,
        value: raw.to_string(),
    }
}
