//! Session identifier and cookie-consent persistence.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{IdGenerator, SessionId};

use super::{KeyValueStore, is_blank};

// ============================================================================
// Constants
// ============================================================================

/// Key holding the generated session identifier.
pub const SESSION_ID_KEY: &str = "chatSessionId";

/// Key holding the cookie-consent choice.
pub const CONSENT_KEY: &str = "cookieConsent";

// ============================================================================
// ConsentChoice
// ============================================================================

/// The visitor's answer to the cookie banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentChoice {
    /// Visitor accepted cookies.
    Accepted,
    /// Visitor declined cookies.
    Declined,
}

impl ConsentChoice {
    /// Returns the persisted string form.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ConsentChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(Error::storage(format!("unknown consent value: {other}"))),
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// Typed view over a [`KeyValueStore`] for the client's durable keys.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    ids: Arc<dyn IdGenerator>,
}

impl SessionStore {
    /// Creates a session store over `store`, minting ids with `ids`.
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Returns the persisted session identifier, creating it on first use.
    ///
    /// The identifier is generated at most once per backing store, even
    /// when several threads or clients share it; every later call returns
    /// the stored value.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn session_id(&self) -> Result<SessionId> {
        let mut created = false;
        let value = self.store.get_or_insert_with(SESSION_ID_KEY, &mut || {
            created = true;
            self.ids.session_id().as_str().to_string()
        })?;

        let id = SessionId::new(value);
        if created {
            info!(session_id = %id, "Created new session id");
        } else {
            debug!(session_id = %id, "Reusing stored session id");
        }
        Ok(id)
    }

    /// Returns the stored session identifier without creating one.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn existing_session_id(&self) -> Result<Option<SessionId>> {
        Ok(self
            .store
            .get(SESSION_ID_KEY)?
            .filter(|s| !is_blank(s))
            .map(SessionId::new))
    }

    /// Forgets the session identifier; the next call mints a new one.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn reset_session_id(&self) -> Result<()> {
        self.store.remove(SESSION_ID_KEY)
    }

    /// Returns the recorded consent choice, if any.
    ///
    /// Unrecognized stored values are logged and reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn consent(&self) -> Result<Option<ConsentChoice>> {
        let Some(raw) = self.store.get(CONSENT_KEY)? else {
            return Ok(None);
        };

        match raw.parse::<ConsentChoice>() {
            Ok(choice) => Ok(Some(choice)),
            Err(e) => {
                warn!(error = %e, "Ignoring stored consent value");
                Ok(None)
            }
        }
    }

    /// Records the consent choice.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn set_consent(&self, choice: ConsentChoice) -> Result<()> {
        self.store.set(CONSENT_KEY, choice.as_str())?;
        debug!(%choice, "Consent recorded");
        Ok(())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
