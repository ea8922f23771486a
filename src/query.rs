// Read-side selections over the processed and gold tables

use std::cmp::Reverse;

use crate::types::{MovieAnalytics, NormalizedMovie};

/// Every movie carrying `genre` (case-insensitive), newest first.
///
/// Movies without a year sort after every dated one. The sort is stable so
/// ties keep their input order.
pub fn movies_by_genre<'a>(movies: &'a [NormalizedMovie], genre: &str) -> Vec<&'a NormalizedMovie> {
    let mut matches: Vec<&NormalizedMovie> = movies.iter().filter(|m| m.has_genre(genre)).collect();
    matches.sort_by_key(|m| (m.year.is_none(), Reverse(m.year)));
    matches
}

/// The first `top_n` of [`movies_by_genre`].
pub fn top_movies_by_genre<'a>(movies: &'a [NormalizedMovie], genre: &str, top_n: usize) -> Vec<&'a NormalizedMovie> {
    let mut matches = movies_by_genre(movies, genre);
    matches.truncate(top_n);
    matches
}

/// Gold rows with an average strictly above `min_average` and strictly more
/// than `min_ratings` ratings, optionally limited to one genre.
pub fn top_rated_candidates<'a>(
    analytics: &'a [MovieAnalytics],
    min_average: f64,
    min_ratings: u64,
    genre: Option<&str>,
) -> Vec<&'a MovieAnalytics> {
    use rust_decimal::prelude::ToPrimitive;

    analytics
        .iter()
        .filter(|row| row.average_rating.to_f64().is_some_and(|avg| avg > min_average))
        .filter(|row| row.num_ratings > min_ratings)
        .filter(|row| genre.map_or(true, |g| row.has_genre(g)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn movie(id: i64, year: Option<i32>, genres: &[&str]) -> NormalizedMovie {
        NormalizedMovie {
            movie_id: id,
            title: format!("Movie {id}"),
            year,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn gold(id: i64, avg: &str, n: u64, genres: &[&str]) -> MovieAnalytics {
        MovieAnalytics {
            movie_id: id,
            title: format!("Movie {id}"),
            year: Some(2000),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            average_rating: Decimal::from_str(avg).unwrap(),
            num_ratings: n,
        }
    }

    #[test]
    fn newest_first_with_undated_last() {
        let movies = vec![
            movie(1, Some(1995), &["Comedy"]),
            movie(2, None, &["Comedy"]),
            movie(3, Some(2010), &["comedy"]),
            movie(4, Some(1995), &["Comedy", "Drama"]),
            movie(5, Some(2020), &["Drama"]),
        ];

        let ids: Vec<i64> = top_movies_by_genre(&movies, "COMEDY", 10).iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
    }

    #[test]
    fn top_n_truncates() {
        let movies = vec![movie(1, Some(1990), &["Action"]), movie(2, Some(1991), &["Action"])];
        let top = top_movies_by_genre(&movies, "Action", 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].movie_id, 2);
        assert!(top_movies_by_genre(&movies, "Western", 5).is_empty());
    }

    #[test]
    fn zero_top_n_is_empty_even_with_matches() {
        let movies = vec![movie(1, Some(1990), &["Action"])];
        assert_eq!(movies_by_genre(&movies, "action").len(), 1);
        assert!(top_movies_by_genre(&movies, "action", 0).is_empty());
    }

    #[test]
    fn candidates_need_both_thresholds_strictly() {
        let rows = vec![
            gold(1, "4.50", 51, &["Drama"]),
            gold(2, "4.00", 100, &["Drama"]),
            gold(3, "4.80", 50, &["Drama"]),
            gold(4, "4.20", 60, &["Comedy"]),
        ];

        let ids: Vec<i64> = top_rated_candidates(&rows, 4.0, 50, None).iter().map(|r| r.movie_id).collect();
        assert_eq!(ids, vec![1, 4]);

        let drama: Vec<i64> = top_rated_candidates(&rows, 4.0, 50, Some("drama"))
            .iter()
            .map(|r| r.movie_id)
            .collect();
        assert_eq!(drama, vec![1]);
    }
}
