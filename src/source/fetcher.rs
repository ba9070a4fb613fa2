//! HTTP fetcher for the spreadsheet export
//!
//! Issues one uncached GET per call. Every request asks intermediaries not to
//! serve a stored copy, so an edit to the spreadsheet shows up on the next
//! fetch instead of after some proxy's expiry.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA, USER_AGENT},
    Client, Response,
};
use std::time::Duration;
use url::Url;

use super::JokeSource;
use crate::config::SourceConfig;
use crate::utils::decode_utf8;
use crate::utils::error::FetchError;

/// Joke source reading a CSV export over HTTP
#[derive(Debug, Clone)]
pub struct HttpJokeSource {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Export URL
    url: Url,

    /// User agent sent with every request
    user_agent: String,
}

impl HttpJokeSource {
    /// Create a source for `url` with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if `url` does not parse, or
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn new(url: &str) -> Result<Self, FetchError> {
        Self::with_config(&SourceConfig {
            url: url.to_string(),
            ..SourceConfig::default()
        })
    }

    /// Create a source from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if the configured URL does not parse,
    /// or `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(config: &SourceConfig) -> Result<Self, FetchError> {
        let url = Url::parse(&config.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            url,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Export URL this source reads
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build request headers that bypass HTTP caches
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/csv,text/plain;q=0.9,*/*;q=0.5"),
        );
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        headers
    }

    /// Read the body of a successful response
    async fn read_body(response: Response) -> Result<String, FetchError> {
        let bytes = response.bytes().await.map_err(Self::classify)?;
        decode_utf8(&bytes)
    }

    fn classify(error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(error)
        }
    }
}

#[async_trait]
impl JokeSource for HttpJokeSource {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        tracing::debug!(url = %self.url, "Fetching joke export");

        let response = self
            .client
            .get(self.url.clone())
            .headers(self.build_headers())
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = Self::read_body(response).await?;
        tracing::debug!(url = %self.url, bytes = body.len(), "Joke export fetched");
        Ok(body)
    }
}
