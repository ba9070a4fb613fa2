//! jokebox - non-repeating joke rotation
//!
//! Fetches a list of jokes from a spreadsheet exported as one-joke-per-line
//! CSV, caches it locally, remembers which jokes a visitor has already seen,
//! and hands out a random unseen joke on demand. Every joke is shown once
//! before any joke repeats.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and settings
//! - [`engine`] - Rotation engine: cache lifecycle, fetch with retry, selection
//! - [`parser`] - Export body parsing and setup/punchline segmentation
//! - [`models`] - Core data structures and the joke id hash
//! - [`source`] - Remote joke source over HTTP
//! - [`storage`] - Persistent key/value stores and record formats
//! - [`utils`] - Retry loop, error types and helpers
//!
//! # Example
//!
//! ```no_run
//! use jokebox::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let source = HttpJokeSource::with_config(&config.source)?;
//!     let store = FileStore::new(&config.storage.dir)?;
//!
//!     let mut engine = RotationEngine::from_config(&config, source, store);
//!     engine.init().await?;
//!     let _joke = engine.get_next();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod parser;
pub mod source;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{EngineOptions, EngineState, RotationEngine};
    pub use crate::error::{Error, ErrorCategory, JokeboxErrorTrait, Result};
    pub use crate::models::{Delivery, Joke, JokeId, Progress};
    pub use crate::parser::{segment, Segment};
    pub use crate::source::{HttpJokeSource, JokeSource};
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
    pub use crate::utils::error::JokeError;
}

// Direct re-exports for convenience
pub use models::{Delivery, Joke, JokeId, Progress};
