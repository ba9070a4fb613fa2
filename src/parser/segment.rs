//! Setup/punchline segmentation
//!
//! Jokes arrive as a single line of text. Two delimiters are used to decide
//! whether a joke has a setup and a punchline that should be revealed
//! separately:
//!
//! 1. an ellipsis (`…`, or three or more literal periods)
//! 2. a question mark followed by more text
//!
//! Anything else is shown as a single block.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const ELLIPSIS: char = '…';

static DOTS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{3,}").unwrap());

static QUESTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?\?)\s*(.*)$").unwrap());

/// Result of segmenting a joke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Joke shown all at once
    SingleBlock { text: String },
    /// Joke with a delayed punchline
    TwoPart { setup: String, punchline: String },
}

impl Segment {
    /// Whether the joke was split
    pub fn has_break(&self) -> bool {
        matches!(self, Self::TwoPart { .. })
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::SingleBlock {
            text: String::new(),
        }
    }
}

/// Segment a joke into setup and punchline where a delimiter suggests one
///
/// # Examples
///
/// ```
/// use jokebox::parser::segment::{segment, Segment};
///
/// let seg = segment("Why did the chicken cross the road? To get to the other side.");
/// assert_eq!(
///     seg,
///     Segment::TwoPart {
///         setup: "Why did the chicken cross the road?".into(),
///         punchline: "To get to the other side.".into(),
///     }
/// );
/// ```
pub fn segment(text: &str) -> Segment {
    let normalized = normalize(text);

    if let Some(split) = split_on_ellipsis(&normalized) {
        return split;
    }

    if let Some(split) = split_on_question(&normalized) {
        return split;
    }

    Segment::SingleBlock { text: normalized }
}

/// Segment optional text; absent text yields an empty single block
pub fn segment_opt(text: Option<&str>) -> Segment {
    text.map(segment).unwrap_or_default()
}

/// Trim and collapse runs of three or more periods into `…`
pub fn normalize(text: &str) -> String {
    DOTS_REGEX
        .replace_all(text.trim(), ELLIPSIS.to_string().as_str())
        .into_owned()
}

fn split_on_ellipsis(text: &str) -> Option<Segment> {
    let (before, after) = text.split_once(ELLIPSIS)?;

    // Later ellipses stay inside the punchline
    let punchline = after.trim();
    if punchline.is_empty() {
        return None;
    }

    Some(Segment::TwoPart {
        setup: format!("{}{ELLIPSIS}", before.trim()),
        punchline: punchline.to_string(),
    })
}

fn split_on_question(text: &str) -> Option<Segment> {
    // A quoted question or one running into an ellipsis is part of the story
    if text.contains("?\"") || text.contains("?…") {
        return None;
    }

    let captures = QUESTION_REGEX.captures(text)?;
    let question = captures.get(1)?.as_str();
    let remainder = captures.get(2)?.as_str().trim();
    if remainder.is_empty() {
        return None;
    }

    Some(Segment::TwoPart {
        setup: question.to_string(),
        punchline: remainder.to_string(),
    })
}
