use std::collections::HashMap;

use crate::constants::{GENRE_DELIMITER, NO_GENRES_PLACEHOLDER};
use crate::types::{GenreSet, NormalizedMovie, RawMovieRow};

/// Split a pipe-delimited genre string into its tokens.
///
/// Order and duplicates are preserved and empty tokens are dropped. The
/// result is never empty: a string with no tokens yields the placeholder, and
/// the placeholder itself is kept as a literal single-element list.
pub fn split_genres(raw: &str) -> Vec<String> {
    let tokens: Vec<String> = raw
        .split(GENRE_DELIMITER)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        vec![NO_GENRES_PLACEHOLDER.to_string()]
    } else {
        tokens
    }
}

/// Add every token except the placeholder to `set`.
pub fn accumulate_genres<'a, I>(set: &mut GenreSet, tokens: I)
where
    I: IntoIterator<Item = &'a String>,
{
    for token in tokens {
        if token != NO_GENRES_PLACEHOLDER {
            set.insert(token.clone());
        }
    }
}

/// Global genre catalog across normalized movies, placeholder excluded.
pub fn unique_genres(movies: &[NormalizedMovie]) -> GenreSet {
    let mut set = GenreSet::new();
    for movie in movies {
        accumulate_genres(&mut set, &movie.genres);
    }
    set
}

/// Same catalog computed straight from raw rows.
pub fn unique_genres_from_rows(rows: &[RawMovieRow]) -> GenreSet {
    let mut set = GenreSet::new();
    for row in rows {
        accumulate_genres(&mut set, &split_genres(&row.genres));
    }
    set
}

/// How many movies carry each genre token, most common first (ties by name).
///
/// The placeholder is counted like any other token.
pub fn genre_counts(movies: &[NormalizedMovie]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for movie in movies {
        for genre in &movie.genres {
            *counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(g, c)| (g.to_string(), c))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Decode a serialized genre list.
///
/// Accepts a JSON array (`["Action","Crime"]`), a bracketed list with single
/// or double quoted items (`['Action', 'Crime']`), or a plain pipe-delimited
/// string. The text is only ever tokenized, never evaluated.
pub fn parse_genre_list(raw: &str) -> Result<Vec<String>, String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('[') {
        return Ok(split_genres(trimmed));
    }

    let items = match serde_json::from_str::<Vec<String>>(trimmed) {
        Ok(items) => items,
        Err(_) => parse_quoted_list(trimmed)?,
    };

    if items.is_empty() {
        Ok(vec![NO_GENRES_PLACEHOLDER.to_string()])
    } else {
        Ok(items)
    }
}

fn parse_quoted_list(raw: &str) -> Result<Vec<String>, String> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("unterminated list: {raw}"))?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(other) => return Err(format!("expected a quoted item, found '{other}'")),
        };

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => item.push(escaped),
                    None => return Err("dangling escape at end of list".to_string()),
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err(format!("unterminated item: {item}"));
        }
        items.push(item);

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => return Err(format!("expected ',' between items, found '{other}'")),
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, genres: &[&str]) -> NormalizedMovie {
        NormalizedMovie {
            movie_id: id,
            title: format!("Movie {id}"),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn splits_in_source_order() {
        assert_eq!(
            split_genres("Adventure|Animation|Children"),
            vec!["Adventure", "Animation", "Children"]
        );
    }

    #[test]
    fn keeps_duplicates() {
        assert_eq!(split_genres("Drama|Drama"), vec!["Drama", "Drama"]);
    }

    #[test]
    fn placeholder_is_kept_literally() {
        assert_eq!(split_genres("(no genres listed)"), vec![NO_GENRES_PLACEHOLDER]);
    }

    #[test]
    fn empty_tokens_are_dropped_and_empty_input_gets_placeholder() {
        assert_eq!(split_genres("Action||Crime|"), vec!["Action", "Crime"]);
        assert_eq!(split_genres(""), vec![NO_GENRES_PLACEHOLDER]);
    }

    #[test]
    fn unique_genres_excludes_placeholder() {
        let movies = vec![
            movie(1, &["Adventure", "Animation", "Children"]),
            movie(2, &["Adventure", "Fantasy"]),
            movie(3, &[NO_GENRES_PLACEHOLDER]),
            movie(4, &["Action", "Crime", "Thriller"]),
        ];
        let expected: GenreSet = ["Adventure", "Animation", "Children", "Fantasy", "Action", "Crime", "Thriller"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let set = unique_genres(&movies);
        assert_eq!(set, expected);
        assert!(!set.contains(NO_GENRES_PLACEHOLDER));
    }

    #[test]
    fn unique_genres_is_order_independent_and_idempotent() {
        let a = movie(1, &["Drama", "War"]);
        let b = movie(2, &["Comedy", "Drama"]);
        let forward = unique_genres(&[a.clone(), b.clone()]);
        let backward = unique_genres(&[b.clone(), a.clone()]);
        let doubled = unique_genres(&[a.clone(), b.clone(), a, b]);
        assert_eq!(forward, backward);
        assert_eq!(forward, doubled);
    }

    #[test]
    fn unique_genres_from_rows_matches_normalized_path() {
        let rows = vec![
            RawMovieRow::new("1", "A (2000)", "Horror|Sci-Fi"),
            RawMovieRow::new("2", "B (2001)", "(no genres listed)"),
        ];
        let set = unique_genres_from_rows(&rows);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["Horror", "Sci-Fi"]);
    }

    #[test]
    fn genre_counts_sorted_by_frequency_then_name() {
        let movies = vec![
            movie(1, &["Drama", "Comedy"]),
            movie(2, &["Drama"]),
            movie(3, &["Action", "Comedy"]),
            movie(4, &["Drama"]),
        ];
        assert_eq!(
            genre_counts(&movies),
            vec![
                ("Drama".to_string(), 3),
                ("Comedy".to_string(), 2),
                ("Action".to_string(), 1)
            ]
        );
    }

    #[test]
    fn parses_json_arrays() {
        assert_eq!(parse_genre_list(r#"["Action","Crime"]"#).unwrap(), vec!["Action", "Crime"]);
    }

    #[test]
    fn parses_single_quoted_lists_without_evaluating() {
        assert_eq!(
            parse_genre_list("['Adventure', 'Children', \"Film-Noir\"]").unwrap(),
            vec!["Adventure", "Children", "Film-Noir"]
        );
        assert_eq!(parse_genre_list(r"['Kid\'s Movie']").unwrap(), vec!["Kid's Movie"]);
        assert_eq!(parse_genre_list("[]").unwrap(), vec![NO_GENRES_PLACEHOLDER]);
    }

    #[test]
    fn parses_pipe_delimited_strings() {
        assert_eq!(parse_genre_list("Drama|Romance").unwrap(), vec!["Drama", "Romance"]);
    }

    #[test]
    fn rejects_malformed_lists() {
        assert!(parse_genre_list("['Action', __import__('os')]").is_err());
        assert!(parse_genre_list("['Action'").is_err());
        assert!(parse_genre_list("['Action' 'Crime']").is_err());
    }
}
