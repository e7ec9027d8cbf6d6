//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`ChatClient`]
//! instances. Every collaborator can be replaced, which is how tests swap
//! the network and storage for in-process doubles.
//!
//! # Example
//!
//! ```no_run
//! use guest_chat::ChatClient;
//!
//! # fn example() -> guest_chat::Result<()> {
//! let client = ChatClient::builder()
//!     .api_url("https://api.example.com")
//!     .ws_url("wss://chat.example.com")
//!     .storage_path("/tmp/guest-chat.json")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::auth::{HttpTokenProvider, TokenProvider};
use crate::error::{Error, Result};
use crate::identifiers::{IdGenerator, UuidGenerator};
use crate::storage::{FileStore, KeyValueStore, SessionStore};
use crate::transport::{Dialer, WebSocketDialer};

use super::core::ChatClient;
use super::options::ClientOptions;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "GUEST_CHAT_API_URL";

/// Environment variable holding the real-time backend URL.
pub const WS_URL_ENV: &str = "GUEST_CHAT_WS_URL";

// ============================================================================
// ChatClientBuilder
// ============================================================================

/// Builder for configuring a [`ChatClient`] instance.
///
/// Use [`ChatClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ChatClientBuilder {
    /// Base URL of the HTTP API.
    api_url: Option<String>,
    /// URL of the real-time backend.
    ws_url: Option<String>,
    /// Path of the JSON file store.
    storage_path: Option<PathBuf>,
    /// Explicit store, overriding `storage_path`.
    store: Option<Arc<dyn KeyValueStore>>,
    /// Explicit id generator.
    ids: Option<Arc<dyn IdGenerator>>,
    /// Explicit token provider, overriding `api_url`.
    tokens: Option<Arc<dyn TokenProvider>>,
    /// Explicit dialer, overriding `ws_url`.
    dialer: Option<Arc<dyn Dialer>>,
    /// Timing and endpoint options.
    options: ClientOptions,
}

// ============================================================================
// ChatClientBuilder Implementation
// ============================================================================

impl ChatClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `GUEST_CHAT_API_URL` and
    /// `GUEST_CHAT_WS_URL`.
    ///
    /// Unset variables leave the corresponding setting empty.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(api_url) = env::var(API_URL_ENV) {
            builder.api_url = Some(api_url);
        }
        if let Ok(ws_url) = env::var(WS_URL_ENV) {
            builder.ws_url = Some(ws_url);
        }
        builder
    }

    /// Sets the HTTP API base URL (guest-token endpoint host).
    #[inline]
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the real-time backend URL.
    ///
    /// `http(s)` and `ws(s)` schemes are accepted.
    #[inline]
    #[must_use]
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Persists client state to a JSON file at `path`.
    #[inline]
    #[must_use]
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Uses an explicit key-value store.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses an explicit id generator.
    #[inline]
    #[must_use]
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Uses an explicit token provider instead of the HTTP endpoint.
    #[inline]
    #[must_use]
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Uses an explicit dialer instead of a WebSocket to `ws_url`.
    #[inline]
    #[must_use]
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Sets timing and endpoint options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client with validation.
    ///
    /// Nothing touches the network until
    /// [`initialize`](ChatClient::initialize).
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if options are invalid
    /// - [`Error::Config`] if neither `api_url` nor a token provider is set
    /// - [`Error::Config`] if neither `ws_url` nor a dialer is set
    /// - [`Error::Io`] / [`Error::Storage`] if the file store cannot be opened
    pub fn build(self) -> Result<ChatClient> {
        self.options.validate()?;

        let tokens = self.resolve_tokens()?;
        let dialer = self.resolve_dialer()?;
        let store = self.resolve_store()?;
        let ids = self
            .ids
            .clone()
            .unwrap_or_else(|| Arc::new(UuidGenerator) as Arc<dyn IdGenerator>);

        let sessions = SessionStore::new(store, Arc::clone(&ids));

        debug!("Chat client built");
        Ok(ChatClient::from_parts(
            self.options,
            sessions,
            ids,
            tokens,
            dialer,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChatClientBuilder {
    /// Resolves the token provider.
    fn resolve_tokens(&self) -> Result<Arc<dyn TokenProvider>> {
        if let Some(tokens) = &self.tokens {
            return Ok(Arc::clone(tokens));
        }

        let api_url = self.api_url.as_deref().ok_or_else(|| {
            Error::config(format!(
                "API URL is required. Use .api_url() or set {API_URL_ENV}.\n\
                 Example: ChatClient::builder().api_url(\"https://api.example.com\")"
            ))
        })?;

        let url = Url::parse(api_url)
            .map_err(|e| Error::config(format!("invalid API URL {api_url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "API URL must be http or https: {api_url}"
            )));
        }

        Ok(Arc::new(HttpTokenProvider::new(
            &url,
            self.options.request_timeout,
        )?))
    }

    /// Resolves the dialer.
    fn resolve_dialer(&self) -> Result<Arc<dyn Dialer>> {
        if let Some(dialer) = &self.dialer {
            return Ok(Arc::clone(dialer));
        }

        let ws_url = self.ws_url.as_deref().ok_or_else(|| {
            Error::config(format!(
                "WS URL is required. Use .ws_url() or set {WS_URL_ENV}.\n\
                 Example: ChatClient::builder().ws_url(\"wss://chat.example.com\")"
            ))
        })?;

        Ok(Arc::new(WebSocketDialer::new(
            ws_url,
            &self.options.socket_path,
        )?))
    }

    /// Resolves the key-value store.
    fn resolve_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        if let Some(store) = &self.store {
            return Ok(Arc::clone(store));
        }

        let store = match &self.storage_path {
            Some(path) => FileStore::open(path)?,
            None => FileStore::open_default()?,
        };
        Ok(Arc::new(store))
    }
}

impl fmt::Debug for ChatClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClientBuilder")
            .field("api_url", &self.api_url)
            .field("ws_url", &self.ws_url)
            .field("storage_path", &self.storage_path)
            .field("custom_store", &self.store.is_some())
            .field("custom_tokens", &self.tokens.is_some())
            .field("custom_dialer", &self.dialer.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
