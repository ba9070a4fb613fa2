//! Persisted record formats
//!
//! Both slots are JSON documents tagged with a schema `version`. Anything that
//! does not decode to the current schema is reported as
//! [`JokeError::StorageCorrupt`] so the caller can discard it.
//!
//! The seen slot also accepts the untagged legacy form, a bare array of id
//! strings, since ids are computed with the same hash as before.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{Joke, JokeId};
use crate::utils::error::{JokeError, StorageError};

/// Current schema version of persisted records
pub const SCHEMA_VERSION: u32 = 1;

/// Seen ids of one visitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub version: u32,
    pub ids: Vec<JokeId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSeen {
    Versioned(SeenRecord),
    Legacy(Vec<String>),
}

impl SeenRecord {
    /// Create a record in the current schema
    pub fn new(ids: Vec<JokeId>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            ids,
        }
    }

    /// Decode the raw slot value stored under `key`
    pub fn decode(key: &str, raw: &str) -> Result<Self, JokeError> {
        let stored: StoredSeen =
            serde_json::from_str(raw).map_err(|e| corrupt(key, e.to_string()))?;

        match stored {
            StoredSeen::Versioned(record) if record.version == SCHEMA_VERSION => Ok(record),
            StoredSeen::Versioned(record) => Err(corrupt(
                key,
                format!("unsupported schema version {}", record.version),
            )),
            StoredSeen::Legacy(ids) => {
                tracing::debug!(key, count = ids.len(), "Upgrading legacy seen list");
                Ok(Self::new(ids.into_iter().map(JokeId::from_raw).collect()))
            }
        }
    }

    /// Serialize for storage
    pub fn encode(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Cached joke set with its fetch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    pub jokes: Vec<Joke>,
    /// Fetch time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CacheEnvelope {
    /// Create an envelope stamped with `fetched_at`
    pub fn new(jokes: Vec<Joke>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            jokes,
            timestamp: fetched_at.timestamp_millis(),
        }
    }

    /// Decode the raw slot value stored under `key`
    pub fn decode(key: &str, raw: &str) -> Result<Self, JokeError> {
        let envelope: Self =
            serde_json::from_str(raw).map_err(|e| corrupt(key, e.to_string()))?;

        if envelope.version != SCHEMA_VERSION {
            return Err(corrupt(
                key,
                format!("unsupported schema version {}", envelope.version),
            ));
        }

        Ok(envelope)
    }

    /// Serialize for storage
    pub fn encode(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Age of the envelope at `now`; negative ages count as zero
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now.timestamp_millis().saturating_sub(self.timestamp);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Whether the envelope can be used without refetching
    pub fn is_usable(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.jokes.is_empty() && self.age(now) < ttl
    }
}

fn corrupt(key: &str, reason: String) -> JokeError {
    JokeError::StorageCorrupt {
        key: key.to_string(),
        reason,
    }
}
