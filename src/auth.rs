//! Guest credential acquisition.
//!
//! The real-time channel is authorized with a short-lived guest token,
//! obtained by exchanging the durable session identifier:
//!
//! ```text
//! GET {API_URL}/api/auth/guest-token?sessionId=<id>  ->  { "token": "..." }
//! ```
//!
//! Any non-2xx status fails the exchange. Tokens live only in memory and
//! are never renewed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;

// ============================================================================
// Constants
// ============================================================================

/// Path of the guest-token endpoint relative to the API base URL.
const GUEST_TOKEN_PATH: &str = "api/auth/guest-token";

/// Longest error body carried into [`Error::Credential`].
const MAX_ERROR_BODY: usize = 256;

// ============================================================================
// GuestToken
// ============================================================================

/// Short-lived credential authorizing the real-time channel.
///
/// `Debug` is redacted so the token never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Wraps a token string.
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GuestToken(***)")
    }
}

/// Body of a successful guest-token response.
#[derive(Debug, Deserialize)]
struct GuestTokenResponse {
    token: GuestToken,
}

// ============================================================================
// TokenProvider
// ============================================================================

/// Exchanges a session identifier for a guest credential.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Requests a fresh guest token for `session_id`.
    async fn guest_token(&self, session_id: &SessionId) -> Result<GuestToken>;
}

// ============================================================================
// HttpTokenProvider
// ============================================================================

/// [`TokenProvider`] calling the hosted guest-token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    client: Client,
    endpoint: Url,
}

impl HttpTokenProvider {
    /// Creates a provider for the API rooted at `api_url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint URL cannot be formed
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(api_url: &Url, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Self::with_client(client, api_url)
    }

    /// Creates a provider using an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint URL cannot be formed.
    pub fn with_client(client: Client, api_url: &Url) -> Result<Self> {
        let endpoint = endpoint_url(api_url)?;
        Ok(Self { client, endpoint })
    }

    /// Returns the full guest-token endpoint URL (without query).
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn guest_token(&self, session_id: &SessionId) -> Result<GuestToken> {
        debug!(endpoint = %self.endpoint, %session_id, "Requesting guest token");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("sessionId", session_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY).collect()
            };

            warn!(status = status.as_u16(), "Guest token request rejected");
            return Err(Error::credential(status.as_u16(), message));
        }

        let body: GuestTokenResponse = response.json().await?;
        if body.token.as_str().is_empty() {
            return Err(Error::protocol("guest token response carried an empty token"));
        }

        debug!("Guest token obtained");
        Ok(body.token)
    }
}

/// Builds `{api_url}/api/auth/guest-token`, keeping any base path.
fn endpoint_url(api_url: &Url) -> Result<Url> {
    if api_url.cannot_be_a_base() {
        return Err(Error::config(format!("API URL cannot be a base: {api_url}")));
    }

    let base = api_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/{GUEST_TOKEN_PATH}"))
        .map_err(|e| Error::config(format!("invalid API URL {api_url}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
