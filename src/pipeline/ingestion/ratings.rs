use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::{column_index, open_csv, parse_epoch_seconds, parse_id, require_columns, source_name};
use crate::constants::{REQUIRED_LINK_COLUMNS, REQUIRED_RATING_COLUMNS};
use crate::error::{PipelineError, Result};
use crate::types::{LinkRow, RatingRow, TagRow};

/// Column positions resolved once from the header
struct Columns(Vec<usize>);

impl Columns {
    fn resolve(headers: &StringRecord, names: &[&str]) -> Self {
        Columns(
            names
                .iter()
                .map(|n| column_index(headers, n).unwrap_or(usize::MAX))
                .collect(),
        )
    }

    fn get<'r>(&self, record: &'r StringRecord, i: usize) -> &'r str {
        record.get(self.0[i]).unwrap_or("")
    }
}

/// Read ratings (`userId,movieId,rating,timestamp`) from any CSV reader.
pub fn read_ratings<R: Read>(reader: R, source: &str) -> Result<Vec<RatingRow>> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    collect_ratings(&mut rdr, source)
}

fn collect_ratings<R: Read>(rdr: &mut csv::Reader<R>, source: &str) -> Result<Vec<RatingRow>> {
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &REQUIRED_RATING_COLUMNS, source)?;
    let cols = Columns::resolve(&headers, &REQUIRED_RATING_COLUMNS);

    let mut ratings = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_rating = cols.get(&record, 2);
        let rating = Decimal::from_str(raw_rating.trim()).map_err(|e| PipelineError::Parse {
            row,
            field: "rating".to_string(),
            value: raw_rating.to_string(),
            reason: e.to_string(),
        })?;

        ratings.push(RatingRow {
            user_id: parse_id(cols.get(&record, 0), "userId", row)?,
            movie_id: parse_id(cols.get(&record, 1), "movieId", row)?,
            rating,
            timestamp: parse_epoch_seconds(cols.get(&record, 3), "timestamp", row)?,
        });
    }
    Ok(ratings)
}

/// Load the ratings source. A missing file is a `NotFound` error.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_ratings(path: &Path) -> Result<Vec<RatingRow>> {
    let mut rdr = open_csv(path)?;
    let ratings = collect_ratings(&mut rdr, &source_name(path))?;
    info!("Loaded {} ratings", ratings.len());
    Ok(ratings)
}

/// Load the links source (`movieId,imdbId,tmdbId`). Empty identifiers become `None`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_links(path: &Path) -> Result<Vec<LinkRow>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &REQUIRED_LINK_COLUMNS, &source_name(path))?;
    let cols = Columns::resolve(&headers, &REQUIRED_LINK_COLUMNS);

    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let mut links = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        links.push(LinkRow {
            movie_id: parse_id(cols.get(&record, 0), "movieId", i + 1)?,
            imdb_id: non_empty(cols.get(&record, 1)),
            tmdb_id: non_empty(cols.get(&record, 2)),
        });
    }
    info!("Loaded {} links", links.len());
    Ok(links)
}

/// Load the tags source. Some exports spell the id column `MovieId`; both are accepted.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_tags(path: &Path) -> Result<Vec<TagRow>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let source = source_name(path);

    let movie_key = if column_index(&headers, "movieId").is_some() {
        "movieId"
    } else {
        "MovieId"
    };
    let names = ["userId", movie_key, "tag", "timestamp"];
    require_columns(&headers, &names, &source)?;
    let cols = Columns::resolve(&headers, &names);

    let mut tags = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        tags.push(TagRow {
            user_id: parse_id(cols.get(&record, 0), "userId", row)?,
            movie_id: parse_id(cols.get(&record, 1), movie_key, row)?,
            tag: cols.get(&record, 2).to_string(),
            timestamp: parse_epoch_seconds(cols.get(&record, 3), "timestamp", row)?,
        });
    }
    info!("Loaded {} tags", tags.len());
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_ratings_with_exact_decimals() {
        let csv = "userId,movieId,rating,timestamp\n1,1,4.0,964982703\n1,3,3.5,964981247\n";
        let ratings = read_ratings(csv.as_bytes(), "ratings.csv").unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[1].movie_id, 3);
        assert_eq!(ratings[1].rating, Decimal::from_str("3.5").unwrap());
        assert_eq!(ratings[0].timestamp, 964982703);
    }

    #[test]
    fn non_numeric_rating_is_a_parse_error() {
        let csv = "userId,movieId,rating,timestamp\n1,1,great,964982703\n";
        let err = read_ratings(csv.as_bytes(), "ratings.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { row: 1, ref field, .. } if field == "rating"));
    }

    #[test]
    fn ratings_without_timestamp_column_fail_schema_check() {
        let csv = "userId,movieId,rating\n1,1,4.0\n";
        let err = read_ratings(csv.as_bytes(), "ratings.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Schema { ref missing, .. } if missing == &vec!["timestamp".to_string()]));
    }

    #[test]
    fn links_map_blank_ids_to_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.csv");
        fs::write(&path, "movieId,imdbId,tmdbId\n1,0114709,862\n2,0113497,\n").unwrap();

        let links = load_links(&path).unwrap();
        assert_eq!(links[0].tmdb_id.as_deref(), Some("862"));
        assert_eq!(links[1].imdb_id.as_deref(), Some("0113497"));
        assert_eq!(links[1].tmdb_id, None);
    }

    #[test]
    fn tags_accept_capitalised_movie_id_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.csv");
        fs::write(&path, "userId,MovieId,tag,timestamp\n2,60756,funny,1445714994\n").unwrap();

        let tags = load_tags(&path).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].movie_id, 60756);
        assert_eq!(tags[0].tag, "funny");
    }

    #[test]
    fn missing_ratings_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load_ratings(&dir.path().join("ratings.csv")).unwrap_err();
        assert!(err.is_not_found());
    }
}
