//! OAuth bearer tokens for Google API calls.
//!
//! Clients ask a [`TokenProvider`] for a token before every request. A fixed
//! token (from the caller or the environment) and the Compute Engine
//! metadata server are supported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Result, RiskError};

/// Environment variable read by [`StaticTokenProvider::from_env`].
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh cached metadata tokens this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of OAuth access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the next request.
    async fn access_token(&self) -> Result<String>;
}

/// Type alias for a shared TokenProvider.
pub type SharedTokenProvider = Arc<dyn TokenProvider>;

/// Returns the same token on every call.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider for a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Reads the token from `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(RiskError::credentials(format!(
                "{} is not set",
                ACCESS_TOKEN_ENV
            ))),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

/// Fetches tokens for the default service account from the metadata server.
pub struct MetadataTokenProvider {
    http_client: reqwest::Client,
    url: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl MetadataTokenProvider {
    /// Creates a provider that talks to the standard metadata endpoint.
    pub fn new() -> Self {
        Self::with_url(METADATA_TOKEN_URL)
    }

    /// Creates a provider for a custom metadata URL.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url: url.into(),
            cached: Mutex::new(None),
        }
    }
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }

        let response = self
            .http_client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| RiskError::credentials(format!("metadata server unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::credentials(format!(
                "metadata server returned {}",
                status
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| RiskError::credentials(format!("invalid metadata token: {}", e)))?;

        tracing::debug!(expires_in = token.expires_in, "Fetched access token from metadata server");
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in);
        *cached = Some((token.access_token.clone(), expires_at));
        Ok(token.access_token)
    }
}
