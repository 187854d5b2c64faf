//! Key/value persistence for client state (cart, favorites).
//!
//! Values are JSON documents stored under string keys. [`Persisted`] keeps a
//! typed value in memory and writes the whole document back after every change.
//! Nothing coordinates concurrent writers: the last write wins.

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError>;
}

impl<L: LocalStore + ?Sized> LocalStore for Arc<L> {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError> {
        (**self).remove_item(key)
    }
}

fn check_key(key: &str) -> Result<(), LocalStoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(LocalStoreError::InvalidKey(key.to_string()))
    }
}

/// One `<key>.json` file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let path = self.path_for(key)?;
        // Write-then-rename; readers never see a partial document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote local state {}", path.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        check_key(key)?;
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        check_key(key)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError> {
        check_key(key)?;
        self.items.remove(key);
        Ok(())
    }
}

/// A typed value mirrored to a [`LocalStore`] key.
pub struct Persisted<T, S> {
    key: String,
    store: S,
    value: T,
}

impl<T, S> Persisted<T, S>
where
    T: Serialize + DeserializeOwned + Default,
    S: LocalStore,
{
    /// Loads the value stored under `key`. A missing or unreadable document yields the default.
    pub fn load(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let value = match store.get_item(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Discarding unreadable local state '{}': {}", key, err);
                T::default()
            }),
            Ok(None) => T::default(),
            Err(err) => {
                warn!("Failed to read local state '{}': {}", key, err);
                T::default()
            }
        };
        Self { key, store, value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Applies `f` and writes the new value back.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, LocalStoreError> {
        let result = f(&mut self.value);
        self.save()?;
        Ok(result)
    }

    pub fn save(&self) -> Result<(), LocalStoreError> {
        let raw = serde_json::to_string(&self.value)?;
        self.store.set_item(&self.key, &raw)
    }
}
