use tracing::debug;

use super::genres::split_genres;
use super::title::split_title_year;
use crate::error::{PipelineError, Result};
use crate::types::{NormalizedMovie, RawMovieRow};

/// Normalize one raw row. `row` is the 1-based data row used in error reports.
pub fn transform_movie_record(raw: &RawMovieRow, row: usize) -> Result<NormalizedMovie> {
    let parse_error = |reason: String| PipelineError::Parse {
        row,
        field: "movieId".to_string(),
        value: raw.movie_id.clone(),
        reason,
    };

    let movie_id = raw
        .movie_id
        .trim()
        .parse::<i64>()
        .map_err(|e| parse_error(e.to_string()))?;
    if movie_id <= 0 {
        return Err(parse_error("movieId must be a positive integer".to_string()));
    }

    let (title, year) = split_title_year(&raw.title);

    Ok(NormalizedMovie {
        movie_id,
        title,
        year,
        genres: split_genres(&raw.genres),
    })
}

/// Normalize a batch of raw rows, one output per input in the same order.
///
/// The first row that fails coercion aborts the whole batch.
pub fn transform_movie_records(rows: &[RawMovieRow]) -> Result<Vec<NormalizedMovie>> {
    let movies = rows
        .iter()
        .enumerate()
        .map(|(i, raw)| transform_movie_record(raw, i + 1))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Transformed {} movies ({} without a year)",
        movies.len(),
        movies.iter().filter(|m| m.year.is_none()).count()
    );
    Ok(movies)
}

/// Re-express a normalized movie in raw-row shape.
///
/// Feeding the result back through [`transform_movie_record`] yields the same movie.
pub fn to_raw_row(movie: &NormalizedMovie) -> RawMovieRow {
    let title = match movie.year {
        Some(year) => format!("{} ({year})", movie.title),
        None => movie.title.clone(),
    };
    RawMovieRow {
        movie_id: movie.movie_id.to_string(),
        title,
        genres: movie.genres.join("|"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NO_GENRES_PLACEHOLDER;

    fn sample_raw_movies() -> Vec<RawMovieRow> {
        vec![
            RawMovieRow::new("1", "Toy Story (1995)", "Adventure|Animation|Children"),
            RawMovieRow::new("2", "Jumanji (1995)", "Adventure|Fantasy"),
            RawMovieRow::new("3", "Grumpier Old Men (1995)", "(no genres listed)"),
            RawMovieRow::new("4", "Heat (1995)", "Action|Crime|Thriller"),
        ]
    }

    #[test]
    fn transforms_toy_story() {
        let result = transform_movie_records(&sample_raw_movies()).unwrap();
        let toy_story = &result[0];
        assert_eq!(toy_story.movie_id, 1);
        assert_eq!(toy_story.title, "Toy Story");
        assert_eq!(toy_story.year, Some(1995));
        assert_eq!(toy_story.genres, vec!["Adventure", "Animation", "Children"]);
    }

    #[test]
    fn keeps_placeholder_genre_per_movie() {
        let result = transform_movie_records(&sample_raw_movies()).unwrap();
        let grumpier = &result[2];
        assert_eq!(grumpier.movie_id, 3);
        assert_eq!(grumpier.title, "Grumpier Old Men");
        assert_eq!(grumpier.year, Some(1995));
        assert_eq!(grumpier.genres, vec![NO_GENRES_PLACEHOLDER]);
    }

    #[test]
    fn preserves_order_and_duplicate_ids() {
        let rows = vec![
            RawMovieRow::new("9", "B", "Drama"),
            RawMovieRow::new("2", "A", "Drama"),
            RawMovieRow::new("9", "B again", "Drama"),
        ];
        let ids: Vec<i64> = transform_movie_records(&rows)
            .unwrap()
            .iter()
            .map(|m| m.movie_id)
            .collect();
        assert_eq!(ids, vec![9, 2, 9]);
    }

    #[test]
    fn non_numeric_movie_id_aborts_the_batch() {
        let mut rows = sample_raw_movies();
        rows.insert(1, RawMovieRow::new("abc", "Broken (2000)", "Drama"));
        let err = transform_movie_records(&rows).unwrap_err();
        match err {
            PipelineError::Parse { row, field, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "movieId");
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn zero_or_negative_movie_id_is_rejected() {
        assert!(transform_movie_record(&RawMovieRow::new("0", "Zero", "Drama"), 1).is_err());
        assert!(transform_movie_record(&RawMovieRow::new("-5", "Neg", "Drama"), 1).is_err());
    }

    #[test]
    fn surrounding_whitespace_in_movie_id_is_accepted() {
        let movie = transform_movie_record(&RawMovieRow::new(" 42 ", "Answer (1979)", "Sci-Fi"), 1).unwrap();
        assert_eq!(movie.movie_id, 42);
    }

    #[test]
    fn transform_is_idempotent_on_reserialized_output() {
        let mut rows = sample_raw_movies();
        rows.push(RawMovieRow::new("5", "  No Year Here ", "Documentary"));
        let first = transform_movie_records(&rows).unwrap();
        let round_trip: Vec<RawMovieRow> = first.iter().map(to_raw_row).collect();
        let second = transform_movie_records(&round_trip).unwrap();
        assert_eq!(first, second);
    }
}
