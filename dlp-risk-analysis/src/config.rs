//! Configuration types for the risk analysis flow.
//!
//! This module provides the settings for the completion wait, the Pub/Sub
//! listener, and the REST clients. Defaults match the production services
//! and the timings the flow has always used.

use std::time::Duration;

/// How long to wait for the completion notification before fetching anyway.
///
/// Not scaled to job size: large jobs may take longer than this, in which
/// case the fetch reports the job as incomplete.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Pause after the matching notification, before signalling completion,
/// so the job's results are readable when fetched.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Production DLP endpoint.
pub const DEFAULT_DLP_ENDPOINT: &str = "https://dlp.googleapis.com";

/// Production Pub/Sub endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Attribute on completion notifications that carries the job name.
pub const JOB_NAME_ATTRIBUTE: &str = "DlpJobName";

/// Configuration for waiting on a job-completion notification.
///
/// # Examples
///
/// ```
/// use dlp_risk_analysis::config::{WaitConfig, DEFAULT_WAIT_TIMEOUT};
/// use std::time::Duration;
///
/// let config = WaitConfig::default();
/// assert_eq!(config.timeout, DEFAULT_WAIT_TIMEOUT);
///
/// let config = WaitConfig::new().with_timeout(Duration::from_secs(30));
/// assert_eq!(config.timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Upper bound on the wait. Expiry is not an error.
    pub timeout: Duration,
    /// Delay between receiving the matching message and signalling.
    pub settle_delay: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl WaitConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall wait timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the post-match settle delay.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

/// Configuration for the Pub/Sub listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Number of worker tasks pulling and handling messages concurrently.
    pub workers: usize,
    /// Maximum messages returned by a single pull.
    pub max_messages: u32,
    /// Pause after an empty pull or a transient pull failure.
    pub idle_backoff: Duration,
    /// How long a stopping worker waits for its in-flight pull so the
    /// pulled messages can be rejected instead of left leased.
    pub shutdown_grace: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_messages: 10,
            idle_backoff: Duration::from_millis(250),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl SubscriberConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker count. Zero is raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the per-pull message limit. Zero is raised to one.
    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    /// Sets the idle backoff.
    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    /// Sets the shutdown grace period for in-flight pulls.
    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }
}

/// Configuration for the REST clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the DLP API
    pub dlp_endpoint: String,
    /// Base URL of the Pub/Sub API
    pub pubsub_endpoint: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dlp_endpoint: DEFAULT_DLP_ENDPOINT.to_string(),
            pubsub_endpoint: DEFAULT_PUBSUB_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the DLP endpoint.
    pub fn with_dlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.dlp_endpoint = trim_endpoint(endpoint.into());
        self
    }

    /// Overrides the Pub/Sub endpoint, e.g. to target the emulator.
    pub fn with_pubsub_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.pubsub_endpoint = trim_endpoint(endpoint.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn trim_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_config_defaults() {
        let config = WaitConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_wait_config_builders() {
        let config = WaitConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_settle_delay(Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_subscriber_config_floors() {
        let config = SubscriberConfig::new().with_workers(0).with_max_messages(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_messages, 1);
    }

    #[test]
    fn test_client_config_trims_endpoint() {
        let config = ClientConfig::new()
            .with_dlp_endpoint("http://localhost:9000/")
            .with_pubsub_endpoint("http://localhost:8085");
        assert_eq!(config.dlp_endpoint, "http://localhost:9000");
        assert_eq!(config.pubsub_endpoint, "http://localhost:8085");
        assert_eq!(ClientConfig::default().dlp_endpoint, DEFAULT_DLP_ENDPOINT);
    }
}
