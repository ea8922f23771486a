//! Relational store for the cleaned dataset (SQLite).
//!
//! Mirrors the processed files and raw side tables into a normalized schema:
//! `genre`, `movie`, `movie_genre`, `link`, `rating` and `tag`. Every load is
//! an upsert on the natural key, so re-running a load converges on the same
//! rows instead of duplicating them.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat};
use metrics::counter;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::observability::MetricName;
use crate::pipeline::artifacts::read_cleaned_movies;
pub use crate::pipeline::artifacts::read_unique_genres;
use crate::pipeline::ingestion;
use crate::types::NormalizedMovie;

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS genre (
        genre_id  INTEGER PRIMARY KEY AUTOINCREMENT,
        name      TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS movie (
        movie_id  INTEGER PRIMARY KEY,
        title     TEXT NOT NULL,
        year      INTEGER
    );
    CREATE TABLE IF NOT EXISTS movie_genre (
        movie_id  INTEGER NOT NULL REFERENCES movie(movie_id),
        genre_id  INTEGER NOT NULL REFERENCES genre(genre_id),
        PRIMARY KEY (movie_id, genre_id)
    );
    CREATE TABLE IF NOT EXISTS link (
        movie_id  INTEGER PRIMARY KEY,
        imdb_id   TEXT,
        tmdb_id   TEXT
    );
    CREATE TABLE IF NOT EXISTS rating (
        user_id   INTEGER NOT NULL,
        movie_id  INTEGER NOT NULL,
        rating    REAL NOT NULL,
        rated_at  TEXT NOT NULL,
        PRIMARY KEY (user_id, movie_id)
    );
    CREATE TABLE IF NOT EXISTS tag (
        user_id   INTEGER NOT NULL,
        movie_id  INTEGER NOT NULL,
        tag       TEXT NOT NULL,
        tagged_at TEXT NOT NULL,
        PRIMARY KEY (user_id, movie_id, tag)
    );
"#;

/// Epoch seconds to an RFC 3339 UTC timestamp (`1970-01-01T00:00:00+00:00`).
pub fn to_ts_utc(epoch_seconds: i64) -> Result<String> {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false))
        .ok_or_else(|| PipelineError::Parse {
            row: 0,
            field: "timestamp".to_string(),
            value: epoch_seconds.to_string(),
            reason: "out of range for a UTC timestamp".to_string(),
        })
}

/// Row counts after a full load
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadSummary {
    pub genres: usize,
    pub movies: usize,
    pub movie_genres: usize,
    pub links: usize,
    pub ratings: usize,
    pub tags: usize,
}

pub struct MovieStore {
    conn: Connection,
}

impl MovieStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert the genre catalog and return the name to id mapping.
    pub fn load_genres(&mut self, genres: &[String]) -> Result<HashMap<String, i64>> {
        if genres.is_empty() {
            return Err(PipelineError::EmptyInput("genre list is empty".to_string()));
        }

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare("INSERT INTO genre (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")?;
            for genre in genres {
                insert.execute(params![genre])?;
            }
        }
        tx.commit()?;

        let mut stmt = self.conn.prepare("SELECT genre_id, name FROM genre")?;
        let mapping = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(mapping)
    }

    /// Upsert movies and their genre bridge rows.
    ///
    /// Genres missing from `genre_map` (the placeholder among them) get no bridge row.
    /// Returns the number of bridge rows written.
    pub fn load_movies(&mut self, movies: &[NormalizedMovie], genre_map: &HashMap<String, i64>) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut bridges = 0;
        {
            let mut upsert_movie = tx.prepare(
                "INSERT INTO movie (movie_id, title, year) VALUES (?1, ?2, ?3)
                 ON CONFLICT(movie_id) DO UPDATE SET title = excluded.title, year = excluded.year",
            )?;
            let mut insert_bridge = tx.prepare(
                "INSERT INTO movie_genre (movie_id, genre_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            )?;

            for movie in movies {
                upsert_movie.execute(params![movie.movie_id, movie.title, movie.year])?;
            }
            for movie in movies {
                for genre in &movie.genres {
                    if let Some(genre_id) = genre_map.get(genre) {
                        bridges += insert_bridge.execute(params![movie.movie_id, genre_id])?;
                    }
                }
            }
        }
        tx.commit()?;
        counter!(MetricName::RowsLoaded.as_str(), "table" => "movie").increment(movies.len() as u64);
        Ok(bridges)
    }

    /// Upsert external ids. Non-empty incoming ids win; empty ones keep what is stored.
    /// A missing source is skipped with a warning.
    pub fn load_links(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            warn!("links source not found at {} (skipping)", path.display());
            return Ok(0);
        }
        let links = ingestion::load_links(path)?;

        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO link (movie_id, imdb_id, tmdb_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(movie_id) DO UPDATE SET
                   imdb_id = COALESCE(excluded.imdb_id, link.imdb_id),
                   tmdb_id = COALESCE(excluded.tmdb_id, link.tmdb_id)",
            )?;
            for link in &links {
                upsert.execute(params![link.movie_id, link.imdb_id, link.tmdb_id])?;
            }
        }
        tx.commit()?;
        counter!(MetricName::RowsLoaded.as_str(), "table" => "link").increment(links.len() as u64);
        Ok(links.len())
    }

    /// Upsert ratings keyed by (user, movie). A missing source is skipped with a warning.
    pub fn load_ratings(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            warn!("ratings source not found at {} (skipping)", path.display());
            return Ok(0);
        }
        let ratings = ingestion::load_ratings(path)?;

        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO rating (user_id, movie_id, rating, rated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, movie_id) DO UPDATE SET rating = excluded.rating, rated_at = excluded.rated_at",
            )?;
            for r in &ratings {
                let value = r.rating.to_f64().ok_or_else(|| PipelineError::Parse {
                    row: 0,
                    field: "rating".to_string(),
                    value: r.rating.to_string(),
                    reason: "not representable as a float".to_string(),
                })?;
                upsert.execute(params![r.user_id, r.movie_id, value, to_ts_utc(r.timestamp)?])?;
            }
        }
        tx.commit()?;
        counter!(MetricName::RowsLoaded.as_str(), "table" => "rating").increment(ratings.len() as u64);
        Ok(ratings.len())
    }

    /// Upsert tags keyed by (user, movie, tag). A missing source is skipped with a warning.
    pub fn load_tags(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            warn!("tags source not found at {} (skipping)", path.display());
            return Ok(0);
        }
        let tags = ingestion::load_tags(path)?;

        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO tag (user_id, movie_id, tag, tagged_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, movie_id, tag) DO UPDATE SET tagged_at = excluded.tagged_at",
            )?;
            for t in &tags {
                upsert.execute(params![t.user_id, t.movie_id, t.tag, to_ts_utc(t.timestamp)?])?;
            }
        }
        tx.commit()?;
        counter!(MetricName::RowsLoaded.as_str(), "table" => "tag").increment(tags.len() as u64);
        Ok(tags.len())
    }

    pub fn count(&self, table: Table) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn movie_count(&self) -> Result<usize> {
        self.count(Table::Movie)
    }

    pub fn rating_count(&self) -> Result<usize> {
        self.count(Table::Rating)
    }

    pub fn genre_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM genre ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn get_movie(&self, movie_id: i64) -> Result<Option<(String, Option<i32>)>> {
        let movie = self
            .conn
            .query_row(
                "SELECT title, year FROM movie WHERE movie_id = ?1",
                params![movie_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(movie)
    }

    pub fn get_rated_at(&self, user_id: i64, movie_id: i64) -> Result<Option<String>> {
        let rated_at = self
            .conn
            .query_row(
                "SELECT rated_at FROM rating WHERE user_id = ?1 AND movie_id = ?2",
                params![user_id, movie_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rated_at)
    }

    /// Delete every row, children first.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM movie_genre;
             DELETE FROM tag;
             DELETE FROM rating;
             DELETE FROM link;
             DELETE FROM movie;
             DELETE FROM genre;
             COMMIT;",
        )?;
        info!("Cleared all data from the store");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Genre,
    Movie,
    MovieGenre,
    Link,
    Rating,
    Tag,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Genre => "genre",
            Table::Movie => "movie",
            Table::MovieGenre => "movie_genre",
            Table::Link => "link",
            Table::Rating => "rating",
            Table::Tag => "tag",
        }
    }
}

/// Load the processed files and raw side tables into the store.
///
/// The cleaned movies and the genre catalog are required. Links, ratings and
/// tags are optional. Each table is committed before the next one starts.
#[instrument(skip(config), fields(db = %config.database.path.display()))]
pub fn run_load(config: &Config) -> Result<LoadSummary> {
    for required in [config.movies_cleaned(), config.unique_genres()] {
        if !required.exists() {
            return Err(PipelineError::not_found(required));
        }
    }

    let mut store = MovieStore::open(&config.database.path)?;
    load_all(&mut store, config)
}

/// Same as [`run_load`] against an already opened store.
pub fn load_all(store: &mut MovieStore, config: &Config) -> Result<LoadSummary> {
    info!("Loading genre catalog");
    let genres = read_unique_genres(&config.unique_genres())?;
    let genre_map = store.load_genres(&genres)?;

    info!("Loading movies and genre relations");
    let movies = read_cleaned_movies(&config.movies_cleaned())?;
    let movie_genres = store.load_movies(&movies, &genre_map)?;

    info!("Loading links");
    let links = store.load_links(&config.links_raw())?;

    info!("Loading ratings");
    let ratings = store.load_ratings(&config.ratings_raw())?;

    info!("Loading tags");
    let tags = store.load_tags(&config.tags_raw())?;

    let summary = LoadSummary {
        genres: genre_map.len(),
        movies: movies.len(),
        movie_genres,
        links,
        ratings,
        tags,
    };
    info!(?summary, "Load completed successfully");
    Ok(summary)
}
