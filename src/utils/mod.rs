//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use encoding_rs::UTF_8;

use crate::utils::error::FetchError;

/// Decode a response body as UTF-8, dropping a leading byte order mark
///
/// Spreadsheet exports frequently start with a BOM, which would otherwise end
/// up in the first joke and change its id.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, FetchError> {
    let (cow, had_errors) = UTF_8.decode_with_bom_removal(bytes);

    if had_errors {
        return Err(FetchError::Decode("UTF-8 decoding errors".to_string()));
    }

    Ok(cow.into_owned())
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
