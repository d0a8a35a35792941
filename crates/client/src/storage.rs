//! Key-value storage backing the conversation store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors of a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage location could not be determined.
    #[error("no storage location: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be encoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A string-to-string store, like the browser's local storage.
pub trait KeyValueStore {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// A store that lives in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    #[inline]
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    #[inline]
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// A store kept in a single JSON file.
///
/// The whole file is rewritten on every change, through a temporary file
/// that is renamed over the old one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`, creating its directory if needed.
    ///
    /// A missing file is an empty store. So is a file that doesn't parse,
    /// which is reported as a warning and overwritten on the next change.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("ignoring corrupt store {}: {err}", path.display());
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    /// Opens the store in the user's config directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = dirs::config_dir().ok_or_else(|| {
            StorageError::Unavailable(
                "could not determine config directory".to_owned(),
            )
        })?;
        Self::open(dir.join("persona-chat").join("store.json"))
    }

    /// Path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    #[inline]
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value);
        self.flush()
    }
}
