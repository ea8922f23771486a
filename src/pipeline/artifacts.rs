//! Processed and gold layer artifacts: rendering, all-or-nothing writes, and reading back.
//!
//! Every stage renders all of its outputs in memory first and then hands them
//! to [`StagedOutputs::commit`], which writes each file next to its target and
//! renames them into place only once every write succeeded. A failed stage
//! therefore never leaves half-written outputs, and re-running a stage fully
//! overwrites the previous run.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::processing::parse_genre_list;
use crate::types::{GenreSet, MovieAnalytics, NormalizedMovie};

/// A file written by a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Outputs of one stage, held in memory until the stage commits.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl StagedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.push((path.into(), bytes));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every staged file, then rename them all into place.
    pub fn commit(self) -> Result<Vec<OutputFile>> {
        let mut written: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());

        for (target, bytes) in &self.files {
            let tmp = temp_path_for(target);
            let result = target
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&tmp, bytes));

            if let Err(e) = result {
                for (tmp_path, _) in &written {
                    let _ = fs::remove_file(tmp_path);
                }
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            written.push((tmp, target.clone()));
        }

        // Renames are not atomic as a group: targets renamed before a failure
        // stay replaced. What is left unrenamed is cleaned up.
        for (i, (tmp, target)) in written.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, target) {
                for (pending, _) in &written[i..] {
                    let _ = fs::remove_file(pending);
                }
                return Err(e.into());
            }
            debug!("Wrote {}", target.display());
        }

        Ok(self
            .files
            .iter()
            .map(|(path, bytes)| OutputFile {
                path: path.display().to_string(),
                sha256: sha256_hex(bytes),
                bytes: bytes.len(),
            })
            .collect())
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    target.with_file_name(format!(".{name}.tmp"))
}

/// Cleaned movies as a pretty JSON array with four-space indentation.
pub fn render_movies_json(movies: &[NormalizedMovie]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    movies.serialize(&mut ser)?;
    Ok(buf)
}

/// Genre catalog, sorted, one token per line.
pub fn render_unique_genres(genres: &GenreSet) -> Vec<u8> {
    let mut out = String::new();
    for genre in genres {
        out.push_str(genre);
        out.push('\n');
    }
    out.into_bytes()
}

/// `movieId,title,year` projection of the cleaned movies. Absent years are empty cells.
pub fn render_movie_id_title_year(movies: &[NormalizedMovie]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["movieId", "title", "year"])?;
    for m in movies {
        wtr.write_record([
            m.movie_id.to_string(),
            m.title.clone(),
            m.year.map(|y| y.to_string()).unwrap_or_default(),
        ])?;
    }
    into_bytes(wtr)
}

/// Gold layer table. The genres column holds a JSON array so it can be read
/// back with [`parse_genre_list`].
pub fn render_movie_analytics(rows: &[MovieAnalytics]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["movieId", "title", "year", "genres", "average_rating", "num_ratings"])?;
    for row in rows {
        wtr.write_record([
            row.movie_id.to_string(),
            row.title.clone(),
            row.year.map(|y| y.to_string()).unwrap_or_default(),
            serde_json::to_string(&row.genres)?,
            format!("{:.2}", row.average_rating),
            row.num_ratings.to_string(),
        ])?;
    }
    into_bytes(wtr)
}

fn into_bytes(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// Read `movies_cleaned.json`. A missing file is `NotFound`.
pub fn read_cleaned_movies(path: &Path) -> Result<Vec<NormalizedMovie>> {
    if !path.exists() {
        return Err(PipelineError::not_found(path));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read `unique_genres.txt`, skipping blank lines. A missing file is `NotFound`.
pub fn read_unique_genres(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(PipelineError::not_found(path));
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Deserialize)]
struct AnalyticsCsvRow {
    #[serde(rename = "movieId")]
    movie_id: i64,
    title: String,
    year: Option<i32>,
    genres: String,
    average_rating: String,
    num_ratings: u64,
}

/// Read the gold layer table back into typed rows. A missing file is `NotFound`.
pub fn read_movie_analytics(path: &Path) -> Result<Vec<MovieAnalytics>> {
    if !path.exists() {
        return Err(PipelineError::not_found(path));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for (i, result) in rdr.deserialize::<AnalyticsCsvRow>().enumerate() {
        let raw = result?;
        let row = i + 1;
        let genres = parse_genre_list(&raw.genres).map_err(|reason| PipelineError::Parse {
            row,
            field: "genres".to_string(),
            value: raw.genres.clone(),
            reason,
        })?;
        let average_rating = Decimal::from_str(raw.average_rating.trim()).map_err(|e| PipelineError::Parse {
            row,
            field: "average_rating".to_string(),
            value: raw.average_rating.clone(),
            reason: e.to_string(),
        })?;

        rows.push(MovieAnalytics {
            movie_id: raw.movie_id,
            title: raw.title,
            year: raw.year,
            genres,
            average_rating,
            num_ratings: raw.num_ratings,
        });
    }

    if rows.is_empty() {
        warn!("Analytics table {} has no rows", path.display());
    }
    Ok(rows)
}
