// Data processing: title/year splitting, genre normalization, record transformation and analytics

pub mod analytics;
pub mod genres;
pub mod title;
pub mod transform;

pub use analytics::{build_movie_analytics, round_average, summarize_ratings};
pub use genres::{genre_counts, parse_genre_list, split_genres, unique_genres, unique_genres_from_rows};
pub use title::split_title_year;
pub use transform::{transform_movie_record, transform_movie_records};
