//! Joke rotation engine
//!
//! The engine owns the current joke set and the visitor's seen set. It loads
//! jokes from the cache envelope while that is fresh, otherwise from the remote
//! source with bounded retries, and hands out unseen jokes at random until
//! every joke has been shown, at which point the seen set starts over.
//!
//! # Example
//!
//! ```no_run
//! use jokebox::config::Config;
//! use jokebox::engine::RotationEngine;
//! use jokebox::source::HttpJokeSource;
//! use jokebox::storage::FileStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let source = HttpJokeSource::with_config(&config.source)?;
//! let store = FileStore::new(&config.storage.dir)?;
//!
//! let mut engine = RotationEngine::from_config(&config, source, store);
//! engine.init().await?;
//! if let Some(joke) = engine.get_next() {
//!     println!("{joke:?}");
//! }
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Delivery, Joke, JokeId, Progress};
use crate::parser::{parse_jokes, segment};
use crate::source::JokeSource;
use crate::storage::{CacheEnvelope, KeyValueStore, SeenRecord};
use crate::utils::error::{FetchError, JokeError};
use crate::utils::retry::{with_retry_if, RetryConfig, Sleep, TokioSleep};
use crate::utils::truncate_text;

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// `init` has not been called
    Uninitialized,
    /// `init` is in progress
    Loading,
    /// A joke set is loaded
    Ready,
    /// The last `init` could not obtain any jokes
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Storage key of the seen-id slot
    pub seen_key: String,

    /// Storage key of the cache envelope slot
    pub cache_key: String,

    /// How long a cache envelope stays usable
    pub cache_ttl: Duration,

    /// Fetch retry policy
    pub retry: RetryConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            seen_key: config.storage.seen_key.clone(),
            cache_key: config.storage.cache_key.clone(),
            cache_ttl: config.cache_ttl(),
            retry: config.retry_config(),
        }
    }
}

/// Why a single fetch attempt did not produce jokes
#[derive(Debug)]
enum AttemptError {
    Fetch(FetchError),
    Empty,
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Empty => true,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Empty => f.write_str("no jokes in response body"),
        }
    }
}

/// Rotation engine over a joke source and a persistent store
pub struct RotationEngine<S, K> {
    source: S,
    store: K,
    sleeper: Box<dyn Sleep>,
    options: EngineOptions,
    rng: ChaCha8Rng,
    jokes: Vec<Joke>,
    seen: HashSet<JokeId>,
    state: EngineState,
}

impl<S: JokeSource, K: KeyValueStore> RotationEngine<S, K> {
    /// Create an engine; nothing is loaded until [`init`](Self::init)
    pub fn new(options: EngineOptions, source: S, store: K) -> Self {
        Self {
            source,
            store,
            sleeper: Box::new(TokioSleep),
            options,
            rng: ChaCha8Rng::from_entropy(),
            jokes: Vec::new(),
            seen: HashSet::new(),
            state: EngineState::Uninitialized,
        }
    }

    /// Create an engine from application configuration
    pub fn from_config(config: &Config, source: S, store: K) -> Self {
        Self::new(EngineOptions::from(config), source, store)
    }

    /// Replace the delay primitive used between fetch attempts
    #[must_use]
    pub fn with_sleep(mut self, sleeper: impl Sleep + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Make joke selection reproducible
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current joke set
    pub fn jokes(&self) -> &[Joke] {
        &self.jokes
    }

    /// Whether `id` has been delivered since the last reset
    pub fn is_seen(&self, id: &JokeId) -> bool {
        self.seen.contains(id)
    }

    /// Progress through the current rotation
    pub fn progress(&self) -> Progress {
        Progress {
            seen: self.seen.len(),
            total: self.jokes.len(),
        }
    }

    /// Load the seen set and a joke set
    ///
    /// A fresh, non-empty cache envelope is used as is; otherwise the jokes
    /// are fetched from the source. Calling `init` again after a failure
    /// retries the whole load.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure when no usable cache exists and every fetch
    /// attempt failed
    pub async fn init(&mut self) -> Result<(), JokeError> {
        self.state = EngineState::Loading;
        self.seen = self.load_seen();

        if let Some(envelope) = self.load_cache() {
            info!(
                jokes = envelope.jokes.len(),
                age_ms = envelope.age(Utc::now()).as_millis() as u64,
                "Using cached jokes"
            );
            self.jokes = envelope.jokes;
            self.prune_seen_ids();
            self.state = EngineState::Ready;
            return Ok(());
        }

        match self.fetch_remote().await {
            Ok(()) => {
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Could not load any jokes");
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    /// Fetch, parse and cache the joke set from the source
    ///
    /// Transport errors, non-success statuses and bodies without jokes are
    /// retried after a fixed delay until the attempt limit. On success the
    /// cache envelope is rewritten and the seen set pruned; on failure the
    /// current joke set is left untouched.
    ///
    /// Before `init` has loaded anything, the stored seen set is read first
    /// so pruning and later deliveries build on it.
    ///
    /// # Errors
    ///
    /// `JokeError::Network` or `JokeError::EmptyResult` once attempts run out
    pub async fn fetch_remote(&mut self) -> Result<(), JokeError> {
        if matches!(self.state, EngineState::Uninitialized | EngineState::Failed) {
            self.seen = self.load_seen();
        }

        let source = &self.source;

        let result = with_retry_if(
            &self.options.retry,
            self.sleeper.as_ref(),
            |attempt| async move {
                let body = source.fetch_body().await.map_err(AttemptError::Fetch)?;
                let jokes = parse_jokes(&body);
                if jokes.is_empty() {
                    return Err(AttemptError::Empty);
                }
                debug!(attempt, jokes = jokes.len(), "Parsed joke export");
                Ok::<_, AttemptError>(jokes)
            },
            AttemptError::is_retryable,
        )
        .await;

        let jokes = result.map_err(|failure| match failure.error {
            AttemptError::Fetch(last) => JokeError::Network {
                attempts: failure.attempts,
                last,
            },
            AttemptError::Empty => JokeError::EmptyResult {
                attempts: failure.attempts,
            },
        })?;

        info!(jokes = jokes.len(), "Fetched jokes from source");
        self.jokes = jokes;
        self.save_cache();
        self.prune_seen_ids();
        Ok(())
    }

    /// Refetch regardless of cache freshness
    ///
    /// # Errors
    ///
    /// Same as [`fetch_remote`](Self::fetch_remote); the loaded set is kept
    pub async fn refresh(&mut self) -> Result<(), JokeError> {
        self.fetch_remote().await?;
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Drop seen ids that are not in the current joke set
    ///
    /// Returns the number of ids removed. The seen slot is only rewritten
    /// when something was removed.
    pub fn prune_seen_ids(&mut self) -> usize {
        let current: HashSet<&JokeId> = self.jokes.iter().map(|joke| &joke.id).collect();
        let before = self.seen.len();
        self.seen.retain(|id| current.contains(id));

        let removed = before - self.seen.len();
        if removed > 0 {
            debug!(removed, "Pruned stale seen ids");
            self.save_seen();
        }
        removed
    }

    /// Deliver the next joke, or `None` when no jokes are loaded
    ///
    /// Only unseen jokes are eligible. Once every joke has been seen the seen
    /// set is cleared and the whole set becomes eligible again.
    pub fn get_next(&mut self) -> Option<Delivery> {
        if self.jokes.is_empty() {
            return None;
        }

        let exhausted = self.jokes.iter().all(|joke| self.seen.contains(&joke.id));
        if exhausted {
            info!(total = self.jokes.len(), "Every joke seen, starting a new rotation");
            self.seen.clear();
            self.save_seen();
        }

        let candidates: Vec<&Joke> = self
            .jokes
            .iter()
            .filter(|joke| !self.seen.contains(&joke.id))
            .collect();
        let picked = candidates.choose(&mut self.rng).map(|&joke| joke.clone())?;

        self.seen.insert(picked.id.clone());
        self.save_seen();

        let progress = self.progress();
        debug!(
            id = %picked.id,
            text = %truncate_text(&picked.text, 40),
            progress = %progress,
            "Delivering joke"
        );

        Some(Delivery::new(picked.id, segment(&picked.text), progress))
    }

    /// Forget every delivered joke and drop the stored seen slot
    pub fn reset_seen(&mut self) {
        self.seen.clear();
        if let Err(e) = self.store.remove(&self.options.seen_key) {
            warn!(key = %self.options.seen_key, error = %e, "Could not clear seen jokes");
        }
        info!("Seen jokes reset");
    }

    fn load_seen(&self) -> HashSet<JokeId> {
        let key = &self.options.seen_key;
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashSet::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read seen jokes, starting fresh");
                return HashSet::new();
            }
        };

        match SeenRecord::decode(key, &raw) {
            Ok(record) => record.ids.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable seen jokes");
                HashSet::new()
            }
        }
    }

    fn save_seen(&self) {
        let mut ids: Vec<JokeId> = self.seen.iter().cloned().collect();
        ids.sort();

        let key = &self.options.seen_key;
        let written = SeenRecord::new(ids)
            .encode()
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(e) = written {
            warn!(key = %key, error = %e, "Could not save seen jokes");
        }
    }

    fn load_cache(&self) -> Option<CacheEnvelope> {
        let key = &self.options.cache_key;
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read joke cache");
                return None;
            }
        };

        let envelope = match CacheEnvelope::decode(key, &raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable joke cache");
                return None;
            }
        };

        if envelope.is_usable(Utc::now(), self.options.cache_ttl) {
            Some(envelope)
        } else {
            debug!(
                jokes = envelope.jokes.len(),
                timestamp = envelope.timestamp,
                "Joke cache expired or empty"
            );
            None
        }
    }

    fn save_cache(&self) {
        let key = &self.options.cache_key;
        let written = CacheEnvelope::new(self.jokes.clone(), Utc::now())
            .encode()
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(e) = written {
            warn!(key = %key, error = %e, "Could not save joke cache");
        }
    }
}
