//! Unified error handling for the jokebox crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available for callers that match on them.
//!
//! # Architecture
//!
//! - [`JokeboxErrorTrait`] - Common interface implemented by the error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping the domain-specific errors

use std::io;
use thiserror::Error;

pub use crate::utils::error::{FetchError, JokeError, StorageError};

/// Common trait for jokebox error types
pub trait JokeboxErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Message suitable for showing to a visitor
    fn user_message(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, empty source)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label for the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network => 2,
            Self::Parsing => 3,
            Self::Storage => 4,
            Self::Config => 5,
            Self::Other => 1,
        }
    }
}

/// Unified error type for the jokebox crate
#[derive(Error, Debug)]
pub enum Error {
    /// Rotation engine errors
    #[error("Joke error: {0}")]
    Joke(#[from] JokeError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl JokeboxErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Joke(JokeError::StorageCorrupt { .. }) => false,
            Self::Joke(JokeError::Network { last, .. }) => last.is_transient(),
            Self::Joke(JokeError::EmptyResult { .. }) => true,
            Self::Fetch(e) => e.is_transient(),
            Self::Storage(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Joke(e) => e.user_message(),
            Self::Fetch(_) => {
                "Sorry, the jokes could not be loaded. Please try again.".to_string()
            }
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::Other { context, .. } => context.clone(),
            Self::Storage(_) | Self::Io(_) | Self::Json(_) => {
                "Sorry, something went wrong while saving your progress.".to_string()
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Joke(JokeError::StorageCorrupt { .. }) => ErrorCategory::Storage,
            Self::Joke(_) | Self::Fetch(_) => ErrorCategory::Network,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
