//! Durable client-side state.
//!
//! A small key-value seam stands in for browser local storage so the
//! session identifier and cookie-consent choice survive restarts.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `file` | JSON file backed store with atomic writes |
//! | `memory` | In-process store for tests and ephemeral clients |
//! | `session` | Typed access to the session and consent keys |

// ============================================================================
// Submodules
// ============================================================================

/// JSON file backed store.
pub mod file;

/// In-memory store.
pub mod memory;

/// Session identifier and consent persistence.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FileStore;
pub use memory::MemoryStore;
pub use session::{ConsentChoice, SessionStore};

use crate::error::Result;

// ============================================================================
// KeyValueStore
// ============================================================================

/// Persisted string key-value store.
///
/// Implementations must make a successful [`set`](Self::set) visible to
/// every later [`get`](Self::get), including from a new instance opened on
/// the same backing storage.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes a value. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Returns the value at `key`, first storing `make()` if the key is
    /// missing or blank.
    ///
    /// Stores shared between threads must override this so the check and
    /// the write happen under one lock; the default is a plain
    /// [`get`](Self::get) then [`set`](Self::set).
    fn get_or_insert_with(&self, key: &str, make: &mut dyn FnMut() -> String) -> Result<String> {
        if let Some(existing) = self.get(key)?
            && !is_blank(&existing)
        {
            return Ok(existing);
        }

        let value = make();
        self.set(key, &value)?;
        Ok(value)
    }
}

/// Blank values count as absent for [`KeyValueStore::get_or_insert_with`].
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
