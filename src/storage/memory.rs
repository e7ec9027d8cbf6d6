//! In-memory key-value store.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::Result;

use super::{KeyValueStore, is_blank};

/// [`KeyValueStore`] kept in process memory.
///
/// Nothing survives the process; useful for tests and for hosts that do
/// not want a session identifier written to disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
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
        entries.insert(key.to_string(), value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn test_get_or_insert_with_keeps_existing() {
        let store = MemoryStore::new();
        store.set("k", "old").unwrap();

        let value = store
            .get_or_insert_with("k", &mut || -> String { panic!("must not mint") })
            .unwrap();
        assert_eq!(value, "old");

        store.set("blank", " ").unwrap();
        let value = store.get_or_insert_with("blank", &mut || "new".into()).unwrap();
        assert_eq!(value, "new");
        assert_eq!(store.get("blank").unwrap().as_deref(), Some("new"));
    }
}
