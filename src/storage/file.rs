//! File-backed key/value store
//!
//! Each key is stored as its own file inside a directory, so the seen set and
//! the joke cache can be rewritten independently.
//!
//! # Example
//!
//! ```no_run
//! use jokebox::storage::{FileStore, KeyValueStore};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), jokebox::utils::error::StorageError> {
//! let store = FileStore::new(Path::new("./data"))?;
//! store.set("jokes_seen", r#"{"version":1,"ids":[]}"#)?;
//! let value = store.get("jokes_seen")?;
//! # Ok(())
//! # }
//! ```

use regex::Regex;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::KeyValueStore;
use crate::utils::error::StorageError;

static INVALID_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\s]"#).unwrap());

/// Store keeping one file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the store's files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name = INVALID_KEY_CHARS.replace_all(key, "_");
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);

        match fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "Store entry loaded");
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        // Write to temp file first, then rename (atomic)
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = File::create(&temp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "Store entry saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Store entry removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
