use std::collections::{BTreeMap, HashMap};

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::constants::AVERAGE_RATING_DECIMALS;
use crate::types::{MovieAnalytics, NormalizedMovie, RatingRow, RatingSummary};

/// Mean of `count` ratings summing to `sum`, rounded to two decimals.
///
/// Arithmetic is exact decimal and ties round half away from zero, so a mean
/// of exactly 4.345 becomes 4.35.
pub fn round_average(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (sum / Decimal::from(count))
        .round_dp_with_strategy(AVERAGE_RATING_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Group ratings by movie: mean and count, one summary per distinct movieId,
/// ordered by movieId.
pub fn summarize_ratings(ratings: &[RatingRow]) -> Vec<RatingSummary> {
    let mut groups: BTreeMap<i64, (Decimal, u64)> = BTreeMap::new();
    for r in ratings {
        let entry = groups.entry(r.movie_id).or_insert((Decimal::ZERO, 0));
        entry.0 += r.rating;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(movie_id, (sum, count))| RatingSummary {
            movie_id,
            average_rating: round_average(sum, count),
            num_ratings: count,
        })
        .collect()
}

/// Build the gold layer table.
///
/// Inner join of movies and rating summaries on movieId: movies without
/// ratings and ratings for unknown movies are dropped. Only rows with strictly
/// more than `min_ratings` ratings are kept. Output is ordered by movieId
/// (stable, so duplicate movie rows keep their input order).
pub fn build_movie_analytics(
    movies: &[NormalizedMovie],
    ratings: &[RatingRow],
    min_ratings: u64,
) -> Vec<MovieAnalytics> {
    let summaries = summarize_ratings(ratings);
    let by_movie: HashMap<i64, &RatingSummary> = summaries.iter().map(|s| (s.movie_id, s)).collect();

    let joined: Vec<MovieAnalytics> = movies
        .iter()
        .filter_map(|m| by_movie.get(&m.movie_id).map(|s| MovieAnalytics::from_parts(m, s)))
        .collect();
    let joined_count = joined.len();

    let mut gold: Vec<MovieAnalytics> = joined
        .into_iter()
        .filter(|row| row.num_ratings > min_ratings)
        .collect();
    gold.sort_by_key(|row| row.movie_id);

    debug!(
        "Joined {} of {} rated movies; {} dropped by the support threshold",
        joined_count,
        summaries.len(),
        joined_count - gold.len()
    );
    info!("Movies with more than {} ratings: {}", min_ratings, gold.len());
    gold
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn movie(id: i64, title: &str) -> NormalizedMovie {
        NormalizedMovie {
            movie_id: id,
            title: title.to_string(),
            year: Some(1995),
            genres: vec!["Drama".to_string()],
        }
    }

    fn ratings_for(movie_id: i64, values: &[&str]) -> Vec<RatingRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| RatingRow {
                user_id: i as i64 + 1,
                movie_id,
                rating: dec(v),
                timestamp: 964982703,
            })
            .collect()
    }

    #[test]
    fn eleven_fives_are_included_with_mean_five() {
        let ratings = ratings_for(1, &["5"; 11]);
        let gold = build_movie_analytics(&[movie(1, "Toy Story")], &ratings, 10);
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].movie_id, 1);
        assert_eq!(gold[0].num_ratings, 11);
        assert_eq!(gold[0].average_rating, dec("5.00"));
        assert_eq!(format!("{:.2}", gold[0].average_rating), "5.00");
    }

    #[test]
    fn exactly_ten_ratings_is_excluded() {
        let ratings = ratings_for(2, &["4"; 10]);
        assert!(build_movie_analytics(&[movie(2, "Jumanji")], &ratings, 10).is_empty());
    }

    #[test]
    fn movie_without_ratings_never_appears() {
        let ratings = ratings_for(1, &["3"; 20]);
        let gold = build_movie_analytics(&[movie(1, "Rated"), movie(7, "Unrated")], &ratings, 10);
        assert_eq!(gold.iter().map(|r| r.movie_id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn ratings_for_unknown_movies_are_discarded() {
        let ratings = ratings_for(99, &["3"; 20]);
        assert!(build_movie_analytics(&[movie(1, "Known")], &ratings, 10).is_empty());
        assert_eq!(summarize_ratings(&ratings).len(), 1);
    }

    #[test]
    fn summaries_cover_every_distinct_movie() {
        let mut ratings = ratings_for(3, &["1", "2"]);
        ratings.extend(ratings_for(1, &["4.5"]));
        let summaries = summarize_ratings(&ratings);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].movie_id, 1);
        assert_eq!(summaries[1].average_rating, dec("1.5"));
        assert_eq!(summaries[1].num_ratings, 2);
    }

    #[test]
    fn half_way_mean_rounds_away_from_zero() {
        assert_eq!(round_average(dec("8.69"), 2), dec("4.35"));
        assert_eq!(round_average(dec("8.67"), 2), dec("4.34"));
        assert_eq!(round_average(dec("8.66"), 2), dec("4.33"));
    }

    #[test]
    fn half_way_mean_through_the_aggregator() {
        // ten 4.5s and one 2.795 average to exactly 4.345
        let mut values = vec!["4.5"; 10];
        values.push("2.795");
        let gold = build_movie_analytics(&[movie(5, "Tie")], &ratings_for(5, &values), 10);
        assert_eq!(gold[0].average_rating, dec("4.35"));
    }

    #[test]
    fn repeating_means_are_rounded_to_two_places() {
        assert_eq!(round_average(dec("10"), 3), dec("3.33"));
        assert_eq!(round_average(dec("11"), 3), dec("3.67"));
    }

    #[test]
    fn output_is_ordered_by_movie_id() {
        let mut ratings = ratings_for(9, &["3"; 11]);
        ratings.extend(ratings_for(4, &["2"; 11]));
        let gold = build_movie_analytics(&[movie(9, "Nine"), movie(4, "Four")], &ratings, 10);
        assert_eq!(gold.iter().map(|r| r.movie_id).collect::<Vec<_>>(), vec![4, 9]);
    }

    #[test]
    fn threshold_is_configurable() {
        let ratings = ratings_for(1, &["4"; 3]);
        assert_eq!(build_movie_analytics(&[movie(1, "Few")], &ratings, 2).len(), 1);
        assert!(build_movie_analytics(&[movie(1, "Few")], &ratings, 3).is_empty());
    }
}
