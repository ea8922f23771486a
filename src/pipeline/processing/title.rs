use once_cell::sync::Lazy;
use regex::Regex;

/// Four ASCII digits in parentheses at the very end of the title,
/// optionally preceded by whitespace.
static TRAILING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(([0-9]{4})\)$").expect("trailing year regex is valid"));

/// Split `"Name (YYYY)"` into `("Name", Some(YYYY))`.
///
/// The pattern is anchored to the end of the raw title, so anything after the
/// closing parenthesis (trailing whitespace included) means there is no year.
/// The returned title is trimmed either way.
pub fn split_title_year(raw: &str) -> (String, Option<i32>) {
    match TRAILING_YEAR_RE.captures(raw) {
        Some(caps) => {
            let year = caps[1].parse::<i32>().ok();
            let start = caps.get(0).map(|m| m.start()).unwrap_or(raw.len());
            (raw[..start].trim().to_string(), year)
        }
        None => (raw.trim().to_string(), None),
    }
}
