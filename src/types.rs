use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A movie row exactly as it appears in the raw movies source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMovieRow {
    #[serde(rename = "movieId")]
    pub movie_id: String,
    pub title: String,
    pub genres: String,
}

impl RawMovieRow {
    pub fn new(movie_id: &str, title: &str, genres: &str) -> Self {
        Self {
            movie_id: movie_id.to_string(),
            title: title.to_string(),
            genres: genres.to_string(),
        }
    }
}

/// A movie after the title/year split and genre tokenization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMovie {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Never empty. A movie without genres carries the placeholder token.
    pub genres: Vec<String>,
}

impl NormalizedMovie {
    /// Case-insensitive exact match against any of this movie's genre tokens
    pub fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.to_lowercase();
        self.genres.iter().any(|g| g.to_lowercase() == wanted)
    }
}

/// Deduplicated genre catalog. Ordered so serialization is deterministic.
pub type GenreSet = BTreeSet<String>;

/// One parsed rating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRow {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: Decimal,
    /// Seconds since the Unix epoch, UTC
    pub timestamp: i64,
}

/// Per-movie aggregate over the ratings source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub num_ratings: u64,
}

/// Gold layer row: a normalized movie joined with its rating summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieAnalytics {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub num_ratings: u64,
}

impl MovieAnalytics {
    pub fn from_parts(movie: &NormalizedMovie, summary: &RatingSummary) -> Self {
        Self {
            movie_id: movie.movie_id,
            title: movie.title.clone(),
            year: movie.year,
            genres: movie.genres.clone(),
            average_rating: summary.average_rating,
            num_ratings: summary.num_ratings,
        }
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.to_lowercase();
        self.genres.iter().any(|g| g.to_lowercase() == wanted)
    }
}

/// External identifiers for a movie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub movie_id: i64,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
}

/// A free-text tag a user attached to a movie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub user_id: i64,
    pub movie_id: i64,
    pub tag: String,
    pub timestamp: i64,
}
