//! File-backed key/value store holding the viewer's saved state.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::StorageError;

/// Key holding the stored documents.
pub const SAVED_FILES_KEY: &str = "htmlViewerSavedFiles";
/// Key holding the persistent resources.
pub const SAVED_RESOURCES_KEY: &str = "htmlViewerSavedResources";
/// Key holding the id of the last viewed document.
pub const LAST_VIEWED_KEY: &str = "htmlViewerLastViewed";

const PROBE_KEY: &str = "__htmlViewerProbe__";

/// String key/value store persisted as a single JSON object.
///
/// Every successful write rewrites the backing file. Writes that would grow the file
/// beyond the quota are rejected and leave the store unchanged.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    quota: usize,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    ///
    /// A file that cannot be parsed is logged and treated as empty.
    pub fn open(path: impl AsRef<Path>, quota: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                error!(path = %path.display(), %err, "cannot parse saved store, starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        Ok(Self {
            path,
            quota,
            entries,
        })
    }

    /// Verify that the store accepts writes.
    pub fn probe(&mut self) -> Result<(), StorageError> {
        self.set(PROBE_KEY, "ok".into())?;
        self.remove(PROBE_KEY)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store `value` under `key`.
    pub fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let previous = self.entries.insert(key.to_string(), value);
        if let Err(err) = self.flush() {
            match previous {
                Some(previous) => self.entries.insert(key.to_string(), previous),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Remove the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// Decode the JSON value stored under `key`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self
            .get(key)
            .map(|raw| serde_json::from_str::<T>(raw))
            .transpose()
            .map_err(StorageError::from)
    }

    /// Encode `value` as JSON and store it under `key`.
    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value)?;
        self.set(key, encoded)
    }

    fn flush(&self) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&self.entries)?;
        if encoded.len() > self.quota {
            return Err(StorageError::QuotaExceeded {
                required: encoded.len(),
                quota: self.quota,
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
