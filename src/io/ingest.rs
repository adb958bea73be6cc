//! CSV ingest.
//!
//! Turns an `njs,jd` CSV into observations that are safe to cluster and fit.
//!
//! - **Strict schema**: an `njs` column and one JD column are required
//!   (`jd`, `jump_distance` or `jumpdistance`, case-insensitive); missing
//!   columns are exit code 2
//! - **Row-level validation**: unparsable or non-finite rows are skipped and
//!   reported, never silently coerced
//! - No filtering or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Observation;
use crate::error::AppError;

const JD_COLUMNS: [&str; 3] = ["jd", "jump_distance", "jumpdistance"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed observations + what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.observations.len()
    }
}

/// Load observations from a CSV file.
pub fn read_observations_csv(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file)
}

/// Load observations from any CSV reader.
pub fn read_observations<R: std::io::Read>(input: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let (njs_idx, jd_idx) = resolve_columns(&header_map)?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, njs_idx, jd_idx) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if observations.is_empty() {
        return Err(AppError::new(3, "No valid rows in CSV input."));
    }

    Ok(IngestedData {
        observations,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<(usize, usize), AppError> {
    let njs = *header_map
        .get("njs")
        .ok_or_else(|| AppError::new(2, "Missing required column: `njs`"))?;
    let jd = JD_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            AppError::new(
                2,
                "Missing required column: one of `jd`, `jump_distance`, `jumpDistance`",
            )
        })?;
    Ok((njs, jd))
}

fn parse_row(record: &StringRecord, njs_idx: usize, jd_idx: usize) -> Result<Observation, String> {
    let njs = parse_value(record, njs_idx, "njs")?;
    let jd = parse_value(record, jd_idx, "jd")?;
    Ok(Observation::new(njs, jd))
}

fn parse_value(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value '{raw}'"))
    }
}
