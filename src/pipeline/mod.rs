// Data processing pipeline: ingestion, processing, and artifact output

pub mod artifacts;
pub mod ingestion;
pub mod processing;

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::observability::MetricName;
use artifacts::{OutputFile, StagedOutputs};

/// Result of an ingestion run (raw movies to processed files)
#[derive(Debug, Serialize)]
pub struct IngestionResult {
    pub run_id: Uuid,
    pub movies_loaded: usize,
    pub unique_genres: usize,
    pub outputs: Vec<OutputFile>,
}

/// Result of an analytics run (processed movies + ratings to the gold table)
#[derive(Debug, Serialize)]
pub struct AnalyticsResult {
    pub run_id: Uuid,
    pub ratings_loaded: usize,
    pub rated_movies: usize,
    pub gold_rows: usize,
    pub outputs: Vec<OutputFile>,
}

pub struct Pipeline;

impl Pipeline {
    /// Load raw movies, normalize them, and write the three processed files.
    ///
    /// A missing movies source is not an error: the run produces nothing.
    /// Schema and parse failures abort before any file is written.
    #[instrument(skip(config), fields(data_dir = %config.paths.data_dir.display()))]
    pub fn run_ingestion(config: &Config) -> Result<IngestionResult> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, "Loading and validating raw movie data...");

        let raw = ingestion::load_movie_data(&config.movies_raw())?;
        counter!(MetricName::RawMoviesLoaded.as_str()).increment(raw.len() as u64);
        if raw.is_empty() {
            warn!("No movie rows to process; skipping output");
            return Ok(IngestionResult {
                run_id,
                movies_loaded: 0,
                unique_genres: 0,
                outputs: Vec::new(),
            });
        }

        let genres = processing::unique_genres_from_rows(&raw);
        info!("Transforming {} movie rows...", raw.len());
        let movies = processing::transform_movie_records(&raw)?;
        counter!(MetricName::MoviesNormalized.as_str()).increment(movies.len() as u64);
        gauge!(MetricName::UniqueGenres.as_str()).set(genres.len() as f64);

        let mut staged = StagedOutputs::new();
        staged.stage(config.movies_cleaned(), artifacts::render_movies_json(&movies)?);
        staged.stage(config.unique_genres(), artifacts::render_unique_genres(&genres));
        staged.stage(
            config.movie_id_title_year(),
            artifacts::render_movie_id_title_year(&movies)?,
        );
        let outputs = staged.commit()?;

        histogram!(MetricName::IngestionDuration.as_str()).record(started.elapsed().as_secs_f64());
        info!(
            "Ingestion complete: {} movies, {} unique genres, {} files written",
            movies.len(),
            genres.len(),
            outputs.len()
        );

        Ok(IngestionResult {
            run_id,
            movies_loaded: movies.len(),
            unique_genres: genres.len(),
            outputs,
        })
    }

    /// Join the cleaned movies with raw ratings and write the gold table.
    ///
    /// Both inputs are required; a missing one is a `NotFound` error.
    #[instrument(skip(config), fields(data_dir = %config.paths.data_dir.display()))]
    pub fn run_analytics(config: &Config) -> Result<AnalyticsResult> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, "Building movie analytics...");

        let movies = artifacts::read_cleaned_movies(&config.movies_cleaned())?;
        let ratings = ingestion::load_ratings(&config.ratings_raw())?;
        counter!(MetricName::RatingsLoaded.as_str()).increment(ratings.len() as u64);

        let rated_movies = processing::summarize_ratings(&ratings).len();
        let gold = processing::build_movie_analytics(&movies, &ratings, config.analytics.min_ratings);
        gauge!(MetricName::GoldRows.as_str()).set(gold.len() as f64);

        let mut staged = StagedOutputs::new();
        staged.stage(config.movie_analytics(), artifacts::render_movie_analytics(&gold)?);
        let outputs = staged.commit()?;

        histogram!(MetricName::AnalyticsDuration.as_str()).record(started.elapsed().as_secs_f64());
        info!(
            "Gold layer complete: {} movies with more than {} ratings",
            gold.len(),
            config.analytics.min_ratings
        );

        Ok(AnalyticsResult {
            run_id,
            ratings_loaded: ratings.len(),
            rated_movies,
            gold_rows: gold.len(),
            outputs,
        })
    }
}
