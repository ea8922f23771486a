// Pipeline ingestion: reading raw tabular sources and validating their headers

pub mod movies;
pub mod ratings;

pub use movies::{load_movie_data, load_movie_rows, read_movie_rows};
pub use ratings::{load_links, load_ratings, load_tags, read_ratings};

use crate::error::{PipelineError, Result};
use csv::StringRecord;
use std::fs::File;
use std::path::Path;

/// Open a CSV source, mapping a missing file to `NotFound` instead of a CSV I/O error.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    if !path.exists() {
        return Err(PipelineError::not_found(path));
    }
    Ok(csv::ReaderBuilder::new().from_path(path)?)
}

/// Check that every required column is present in the header.
///
/// Returns a `Schema` error listing all missing columns (not just the first one).
pub fn require_columns(headers: &StringRecord, required: &[&str], source_name: &str) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema {
            source_name: source_name.to_string(),
            missing,
        })
    }
}

/// Position of a column in the header
pub(crate) fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Parse an integer id field, reporting the 1-based data row on failure.
pub(crate) fn parse_id(value: &str, field: &str, row: usize) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| PipelineError::Parse {
            row,
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Epoch seconds as written by the source. Fractional values are truncated.
pub(crate) fn parse_epoch_seconds(value: &str, field: &str, row: usize) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }
    match trimmed.parse::<f64>() {
        Ok(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        _ => Err(PipelineError::Parse {
            row,
            field: field.to_string(),
            value: value.to_string(),
            reason: "not a number of seconds".to_string(),
        }),
    }
}

pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_columns_lists_every_missing_column() {
        let headers = StringRecord::from(vec!["movieId", "name"]);
        let err = require_columns(&headers, &["movieId", "title", "genres"], "movies.csv").unwrap_err();
        match err {
            PipelineError::Schema { source_name, missing } => {
                assert_eq!(source_name, "movies.csv");
                assert_eq!(missing, vec!["title".to_string(), "genres".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn require_columns_ignores_extra_columns() {
        let headers = StringRecord::from(vec!["genres", "extra", "title", "movieId"]);
        assert!(require_columns(&headers, &["movieId", "title", "genres"], "movies.csv").is_ok());
    }

    #[test]
    fn epoch_seconds_accepts_integers_and_floats() {
        assert_eq!(parse_epoch_seconds("964982703", "timestamp", 1).unwrap(), 964982703);
        assert_eq!(parse_epoch_seconds("964982703.9", "timestamp", 1).unwrap(), 964982703);
        assert!(parse_epoch_seconds("yesterday", "timestamp", 4).is_err());
    }

    #[test]
    fn parse_id_reports_row_and_field() {
        let err = parse_id("abc", "movieId", 7).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { row: 7, ref field, .. } if field == "movieId"));
    }
}
