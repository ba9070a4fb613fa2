// Core data structures for jokebox

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::segment::Segment;

/// Content-derived joke identifier
///
/// The id is the 32-bit string hash `h = h * 31 + unit` over the UTF-16 code
/// units of the text, wrapping in signed 32-bit arithmetic, rendered in
/// lowercase base 36 with a leading `-` for negative values. Stored seen sets
/// written by earlier versions of the page compare equal to these ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JokeId(String);

impl JokeId {
    /// Compute the id of a joke text
    pub fn from_text(text: &str) -> Self {
        Self(to_base36(string_hash(text)))
    }

    /// Wrap an id read back from storage
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit rolling string hash over UTF-16 code units
pub fn string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Render a signed integer in lowercase base 36
pub fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    // i64 so that i32::MIN has a representable magnitude
    let mut magnitude = i64::from(value).unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % 36) as usize]);
        magnitude /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

/// One joke from the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joke {
    pub id: JokeId,
    pub text: String,
}

impl Joke {
    /// Create a joke, deriving its id from the text
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: JokeId::from_text(&text),
            text,
        }
    }
}

/// Rotation progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Jokes delivered since the last reset
    pub seen: usize,
    /// Jokes in the current set
    pub total: usize,
}

impl Progress {
    /// Whether every joke has been delivered since the last reset
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.seen >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.seen, self.total)
    }
}

/// A delivered joke, shaped for the presentation layer
///
/// Serializes as `{id, hasBreak, text?, setup?, punchline?, progress}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: JokeId,
    pub has_break: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub setup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub punchline: Option<String>,
    pub progress: Progress,
}

impl Delivery {
    /// Build a delivery from a segmented joke
    pub fn new(id: JokeId, segment: Segment, progress: Progress) -> Self {
        match segment {
            Segment::SingleBlock { text } => Self {
                id,
                has_break: false,
                text: Some(text),
                setup: None,
                punchline: None,
                progress,
            },
            Segment::TwoPart { setup, punchline } => Self {
                id,
                has_break: true,
                text: None,
                setup: Some(setup),
                punchline: Some(punchline),
                progress,
            },
        }
    }
}
