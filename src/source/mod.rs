//! Remote joke source
//!
//! The engine asks a [`JokeSource`] for the raw export body once per attempt;
//! retrying and parsing stay with the engine.

pub mod fetcher;

use async_trait::async_trait;

use crate::utils::error::FetchError;

pub use fetcher::HttpJokeSource;

/// Capability to download the raw joke export
#[async_trait]
pub trait JokeSource: Send + Sync {
    /// Perform a single fetch of the export body
    async fn fetch_body(&self) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: JokeSource + ?Sized> JokeSource for std::sync::Arc<T> {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        (**self).fetch_body().await
    }
}

/// Fixed in-memory body, for offline use and tests
#[derive(Debug, Clone)]
pub struct StaticSource {
    body: String,
}

impl StaticSource {
    /// Serve `body` on every fetch
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl JokeSource for StaticSource {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        Ok(self.body.clone())
    }
}
