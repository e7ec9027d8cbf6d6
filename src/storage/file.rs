//! JSON file backed key-value store.
//!
//! The whole store is a flat JSON object. Every write replaces the file
//! through a temporary file in the same directory, so a crash mid-write
//! leaves either the old or the new contents on disk.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{KeyValueStore, is_blank};

// ============================================================================
// Constants
// ============================================================================

/// Directory name under the platform data dir.
const APP_DIR: &str = "guest-chat";

/// File name of the default store.
const STORE_FILE: &str = "storage.json";

// ============================================================================
// FileStore
// ============================================================================

/// [`KeyValueStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    /// Location of the JSON file.
    path: PathBuf,
    /// Cached contents, written through on every change.
    entries: Mutex<FxHashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing contents.
    ///
    /// A missing file is treated as an empty store and created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file exists but cannot be read
    /// - [`Error::Storage`] if the file is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => FxHashMap::default(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Error::storage(format!("corrupt store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the store at the platform default location.
    ///
    /// `$XDG_DATA_HOME/guest-chat/storage.json` on Linux, the equivalent
    /// local data directory elsewhere.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no data directory can be determined
    /// - Any error from [`FileStore::open`]
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Returns the platform default store path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no data directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join(STORE_FILE))
            .ok_or_else(|| Error::config("no local data directory for this platform"))
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the map to disk atomically.
    fn flush(&self, entries: &FxHashMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let sorted: BTreeMap<&String, &String> = entries.iter().collect();
        let json = serde_json::to_vec_pretty(&sorted)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        trace!(path = %self.path.display(), "Store flushed");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush(&entries) {
            // Keep memory consistent with disk
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn get_or_insert_with(&self, key: &str, make: &mut dyn FnMut() -> String) -> Result<String> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key)
            && !is_blank(existing)
        {
            return Ok(existing.clone());
        }

        let value = make();
        let previous = entries.insert(key.to_string(), value.clone());

        if let Err(e) = self.flush(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
