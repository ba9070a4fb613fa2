//! Parsing of the joke source body
//!
//! The source is a single-column spreadsheet export: one joke per line,
//! optionally wrapped in double quotes with `""` escaping inside. This is a
//! line parser, not a general CSV parser; no header row and no further columns
//! are interpreted.

pub mod segment;

use crate::models::Joke;

pub use segment::{segment, segment_opt, Segment};

/// Parse a response body into jokes, in source order
///
/// Blank lines, and lines that are empty once unquoted, are skipped.
///
/// # Examples
///
/// ```
/// use jokebox::parser::parse_jokes;
///
/// let jokes = parse_jokes("\"She said \"\"hi\"\"\"\nplain joke\n\n");
/// assert_eq!(jokes.len(), 2);
/// assert_eq!(jokes[0].text, "She said \"hi\"");
/// ```
pub fn parse_jokes(body: &str) -> Vec<Joke> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(unquote_field)
        .filter(|text| !text.is_empty())
        .map(Joke::new)
        .collect()
}

/// Strip one pair of enclosing double quotes and unescape doubled quotes
pub fn unquote_field(field: &str) -> String {
    let inner = field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(field);

    inner.replace("\"\"", "\"")
}
