//! Error types for jokebox
//!
//! This module defines the domain error enums used by the fetcher, the
//! persistent store and the rotation engine.

use thiserror::Error;

/// Errors from a single attempt to fetch the joke source
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Server responded with status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid source URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    ///
    /// A body that fails to decode is the same body on the next attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_) | Self::Decode(_))
    }
}

/// Errors raised by a persistent store backend
///
/// The rotation engine never propagates these; they are logged and the
/// affected slot is treated as absent.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused the operation (disabled storage, quota exceeded)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the rotation engine
#[derive(Error, Debug)]
pub enum JokeError {
    /// Every fetch attempt failed at the transport or HTTP level
    #[error("Could not load jokes after {attempts} attempt(s): {last}")]
    Network {
        /// Attempts made before giving up
        attempts: u32,
        /// Last attempt's failure
        #[source]
        last: FetchError,
    },

    /// The source answered but contained no jokes
    #[error("Joke source returned no jokes after {attempts} attempt(s)")]
    EmptyResult {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// A persisted record was unreadable or had an unexpected schema
    #[error("Stored data under '{key}' is corrupt: {reason}")]
    StorageCorrupt {
        /// Storage key of the record
        key: String,
        /// What was wrong with it
        reason: String,
    },
}

impl JokeError {
    /// Human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Sorry, the jokes could not be loaded. Please check your connection and try again."
                    .to_string()
            }
            Self::EmptyResult { .. } => {
                "Sorry, there are no jokes available right now. Please try again later."
                    .to_string()
            }
            Self::StorageCorrupt { .. } => {
                "Saved joke data was unreadable and has been ignored.".to_string()
            }
        }
    }
}
