use std::io::Read;
use std::path::Path;

use tracing::{info, instrument, warn};

use super::{open_csv, require_columns, source_name};
use crate::constants::REQUIRED_MOVIE_COLUMNS;
use crate::error::{PipelineError, Result};
use crate::types::RawMovieRow;

/// Read raw movie rows from any CSV reader after validating the header.
///
/// Only the header is validated. Rows are kept as strings so that type
/// coercion happens in the transformer, where a bad `movieId` aborts the batch.
pub fn read_movie_rows<R: Read>(reader: R, source: &str) -> Result<Vec<RawMovieRow>> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    collect_rows(&mut rdr, source)
}

fn collect_rows<R: Read>(rdr: &mut csv::Reader<R>, source: &str) -> Result<Vec<RawMovieRow>> {
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &REQUIRED_MOVIE_COLUMNS, source)?;

    let mut rows = Vec::new();
    for result in rdr.deserialize::<RawMovieRow>() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Load raw movie rows from a file.
///
/// Fails with `NotFound` when the file is missing and with `Schema` when a
/// required column is absent.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_movie_rows(path: &Path) -> Result<Vec<RawMovieRow>> {
    let mut rdr = open_csv(path)?;
    let rows = collect_rows(&mut rdr, &source_name(path))?;
    info!("Loaded {} raw movie rows", rows.len());
    Ok(rows)
}

/// Load raw movie rows, treating a missing source as "nothing to process".
///
/// Schema and CSV errors still propagate.
pub fn load_movie_data(path: &Path) -> Result<Vec<RawMovieRow>> {
    match load_movie_rows(path) {
        Err(PipelineError::NotFound { path }) => {
            warn!("Movies source {} was not found; nothing to process", path.display());
            Ok(Vec::new())
        }
        other => other,
    }
}
