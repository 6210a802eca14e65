//! Authenticated JSON-over-HTTP transport shared by the DLP and Pub/Sub clients.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::SharedTokenProvider;
use crate::error::{Result, RiskError};

/// Sends authenticated JSON requests and maps failures to [`RiskError`].
#[derive(Clone)]
pub(crate) struct RestTransport {
    http_client: reqwest::Client,
    token_provider: SharedTokenProvider,
}

impl RestTransport {
    pub(crate) fn new(
        token_provider: SharedTokenProvider,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RiskError::Api {
                status: 0,
                message: format!("Failed to build HTTP client: {}", e),
                is_retriable: false,
                api_error: None,
            })?;
        Ok(Self {
            http_client,
            token_provider,
        })
    }

    /// Sends a request and decodes the JSON response.
    ///
    /// `resource` is the name of the addressed object, reported on 404.
    pub(crate) async fn send<B, T>(
        &self,
        method: Method,
        uri: &str,
        body: Option<&B>,
        resource: &str,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.token_provider.access_token().await?;

        let mut request = self
            .http_client
            .request(method.clone(), uri)
            .bearer_auth(token);

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                RiskError::serdes(format!("Failed to serialize request to {}: {}", uri, e))
            })?;
            request = request
                .header("Content-Type", "application/json")
                .body(bytes);
        }

        tracing::trace!(%method, uri, "Sending request");

        let response = request.send().await.map_err(|e| RiskError::Api {
            status: 0,
            message: format!("HTTP request failed: {}", e),
            is_retriable: e.is_timeout() || e.is_connect(),
            api_error: None,
        })?;

        let status = response.status();
        let response_body = response.bytes().await.map_err(|e| RiskError::Api {
            status: status.as_u16(),
            message: format!("Failed to read response body: {}", e),
            is_retriable: true,
            api_error: None,
        })?;

        if !status.is_success() {
            let error_message = String::from_utf8_lossy(&response_body);
            return Err(RiskError::from_status(
                status.as_u16(),
                &error_message,
                resource,
            ));
        }

        // Empty bodies decode as `{}` so unit-like responses work.
        let payload: &[u8] = if response_body.is_empty() {
            b"{}"
        } else {
            &response_body
        };

        serde_json::from_slice(payload).map_err(|e| {
            RiskError::serdes(format!("Failed to deserialize response from {}: {}", uri, e))
        })
    }
}
