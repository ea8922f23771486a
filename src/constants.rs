//! Dataset-level constants shared across the pipeline stages

/// Literal marker the source uses for a movie without any listed genres
pub const NO_GENRES_PLACEHOLDER: &str = "(no genres listed)";

/// Delimiter between genre tokens in the raw `genres` column
pub const GENRE_DELIMITER: char = '|';

/// Columns a movies source must carry
pub const REQUIRED_MOVIE_COLUMNS: [&str; 3] = ["movieId", "title", "genres"];

/// Columns a ratings source must carry
pub const REQUIRED_RATING_COLUMNS: [&str; 4] = ["userId", "movieId", "rating", "timestamp"];

/// Columns a links source must carry
pub const REQUIRED_LINK_COLUMNS: [&str; 3] = ["movieId", "imdbId", "tmdbId"];

// Raw input file names (under <data_dir>/raw)
pub const MOVIES_RAW_FILE: &str = "movies.csv";
pub const RATINGS_RAW_FILE: &str = "ratings.csv";
pub const LINKS_RAW_FILE: &str = "links.csv";
pub const TAGS_RAW_FILE: &str = "tags.csv";

// Processed outputs (under <data_dir>/processed)
pub const MOVIES_CLEANED_FILE: &str = "movies_cleaned.json";
pub const UNIQUE_GENRES_FILE: &str = "unique_genres.txt";
pub const MOVIE_ID_TITLE_YEAR_FILE: &str = "movie_id_title_year.csv";

// Gold layer output (under <data_dir>/gold)
pub const MOVIE_ANALYTICS_FILE: &str = "movie_analytics.csv";

/// Movies need strictly more ratings than this to reach the gold layer
pub const DEFAULT_MIN_RATINGS: u64 = 10;

/// Decimal places kept on `average_rating`
pub const AVERAGE_RATING_DECIMALS: u32 = 2;

// Candidate pool for the random recommendation endpoint
pub const DEFAULT_TOP_RATED_MIN_AVERAGE: f64 = 4.0;
pub const DEFAULT_TOP_RATED_MIN_RATINGS: u64 = 50;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_PORT: u16 = 5001;
