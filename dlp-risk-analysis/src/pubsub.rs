//! Pub/Sub message model and service client.
//!
//! The listener in [`crate::subscriber`] drives a [`PubsubService`] through
//! three calls of the Pub/Sub v1 REST API: `subscriptions.pull`,
//! `subscriptions.acknowledge`, and `subscriptions.modifyAckDeadline`
//! (a zero deadline is a negative acknowledgement).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::auth::SharedTokenProvider;
use crate::config::ClientConfig;
use crate::error::{Result, RiskError};
use crate::rest::RestTransport;
use crate::types::SubscriptionName;

/// A message published to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    /// Base64-encoded payload
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Key/value attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Server-assigned message ID
    #[serde(default)]
    pub message_id: String,
    /// Publish time, RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
}

impl PubsubMessage {
    /// Creates an empty message with the given ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Default::default()
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the payload, base64-encoding it.
    pub fn with_data(mut self, data: impl AsRef<[u8]>) -> Self {
        self.data = STANDARD.encode(data);
        self
    }

    /// Returns an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Decodes the payload.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| RiskError::serdes(format!("invalid message data: {}", e)))
    }
}

/// A message leased to this subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    /// Handle used to acknowledge or reject the message
    pub ack_id: String,
    /// The message itself
    pub message: PubsubMessage,
    /// Delivery attempt counter, when dead lettering is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<i32>,
}

impl ReceivedMessage {
    /// Creates a received message.
    pub fn new(ack_id: impl Into<String>, message: PubsubMessage) -> Self {
        Self {
            ack_id: ack_id.into(),
            message,
            delivery_attempt: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyAckDeadlineRequest<'a> {
    ack_ids: &'a [String],
    ack_deadline_seconds: i32,
}

/// Trait for the subscription side of Pub/Sub.
#[async_trait]
pub trait PubsubService: Send + Sync {
    /// Pulls up to `max_messages` messages. May return none.
    async fn pull(
        &self,
        subscription: &SubscriptionName,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Acknowledges messages so they are not redelivered.
    async fn acknowledge(&self, subscription: &SubscriptionName, ack_ids: &[String]) -> Result<()>;

    /// Changes the lease on messages.
    async fn modify_ack_deadline(
        &self,
        subscription: &SubscriptionName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<()>;

    /// Rejects messages, making them available for redelivery immediately.
    async fn nack(&self, subscription: &SubscriptionName, ack_ids: &[String]) -> Result<()> {
        self.modify_ack_deadline(subscription, ack_ids, 0).await
    }
}

/// Type alias for a shared PubsubService.
pub type SharedPubsubService = Arc<dyn PubsubService>;

/// REST implementation of the PubsubService.
pub struct HttpPubsubClient {
    transport: RestTransport,
    config: ClientConfig,
}

impl HttpPubsubClient {
    /// Creates a client with the given credentials and configuration.
    pub fn new(token_provider: SharedTokenProvider, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: RestTransport::new(token_provider, config.request_timeout)?,
            config,
        })
    }

    fn method_url(&self, subscription: &SubscriptionName, method: &str) -> String {
        format!("{}/v1/{}:{}", self.config.pubsub_endpoint, subscription, method)
    }
}

#[async_trait]
impl PubsubService for HttpPubsubClient {
    async fn pull(
        &self,
        subscription: &SubscriptionName,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>> {
        let uri = self.method_url(subscription, "pull");
        let response: PullResponse = self
            .transport
            .send(
                Method::POST,
                &uri,
                Some(&PullRequest { max_messages }),
                &subscription.to_string(),
            )
            .await?;
        Ok(response.received_messages)
    }

    async fn acknowledge(&self, subscription: &SubscriptionName, ack_ids: &[String]) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let uri = self.method_url(subscription, "acknowledge");
        let _: IgnoredAny = self
            .transport
            .send(
                Method::POST,
                &uri,
                Some(&AcknowledgeRequest { ack_ids }),
                &subscription.to_string(),
            )
            .await?;
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        subscription: &SubscriptionName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let uri = self.method_url(subscription, "modifyAckDeadline");
        let _: IgnoredAny = self
            .transport
            .send(
                Method::POST,
                &uri,
                Some(&ModifyAckDeadlineRequest {
                    ack_ids,
                    ack_deadline_seconds,
                }),
                &subscription.to_string(),
            )
            .await?;
        Ok(())
    }
}

/// A mock implementation of PubsubService for testing.
///
/// Pull responses are served in order; once exhausted every pull returns
/// no messages.
#[cfg(test)]
pub struct MockPubsubService {
    pull_responses: std::sync::Mutex<std::collections::VecDeque<Result<Vec<ReceivedMessage>>>>,
    acked: std::sync::Mutex<Vec<String>>,
    nacked: std::sync::Mutex<Vec<String>>,
    pulls: std::sync::atomic::AtomicUsize,
    pull_delay: std::time::Duration,
}

#[cfg(test)]
impl MockPubsubService {
    pub fn new() -> Self {
        Self {
            pull_responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            acked: std::sync::Mutex::new(Vec::new()),
            nacked: std::sync::Mutex::new(Vec::new()),
            pulls: std::sync::atomic::AtomicUsize::new(0),
            pull_delay: std::time::Duration::ZERO,
        }
    }

    /// Makes every pull take `delay` before it is served.
    pub fn with_pull_delay(mut self, delay: std::time::Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    pub fn with_pull_response(self, response: Result<Vec<ReceivedMessage>>) -> Self {
        self.pull_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn nacked(&self) -> Vec<String> {
        self.nacked.lock().unwrap().clone()
    }

    pub fn pull_count(&self) -> usize {
        self.pulls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl PubsubService for MockPubsubService {
    async fn pull(
        &self,
        _subscription: &SubscriptionName,
        _max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>> {
        self.pulls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if !self.pull_delay.is_zero() {
            tokio::time::sleep(self.pull_delay).await;
        }
        let next = self.pull_responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn acknowledge(&self, _subscription: &SubscriptionName, ack_ids: &[String]) -> Result<()> {
        self.acked.lock().unwrap().extend_from_slice(ack_ids);
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        _subscription: &SubscriptionName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<()> {
        if ack_deadline_seconds == 0 {
            self.nacked.lock().unwrap().extend_from_slice(ack_ids);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[test]
    fn test_pull_response_deserialization() {
        let json = r#"{
            "receivedMessages": [{
                "ackId": "ack-1",
                "message": {
                    "data": "aGVsbG8=",
                    "attributes": {"DlpJobName": "projects/p/dlpJobs/r-1"},
                    "messageId": "m-1",
                    "publishTime": "2020-01-01T00:00:00Z"
                },
                "deliveryAttempt": 2
            }]
        }"#;
        let response: PullResponse = serde_json::from_str(json).unwrap();
        let received = &response.received_messages[0];
        assert_eq!(received.ack_id, "ack-1");
        assert_eq!(received.delivery_attempt, Some(2));
        assert_eq!(
            received.message.attribute("DlpJobName"),
            Some("projects/p/dlpJobs/r-1")
        );
        assert_eq!(received.message.decoded_data().unwrap(), b"hello");
    }

    #[test]
    fn test_empty_pull_response() {
        let response: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(response.received_messages.is_empty());
    }

    #[test]
    fn test_modify_ack_deadline_request_serialization() {
        let ids = vec!["a".to_string()];
        let json = serde_json::to_value(ModifyAckDeadlineRequest {
            ack_ids: &ids,
            ack_deadline_seconds: 0,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"ackIds": ["a"], "ackDeadlineSeconds": 0}));
    }

    #[test]
    fn test_method_url() {
        let client = HttpPubsubClient::new(
            Arc::new(StaticTokenProvider::new("t")),
            ClientConfig::new().with_pubsub_endpoint("http://localhost:8085"),
        )
        .unwrap();
        let sub = SubscriptionName::new("p", "s").unwrap();
        assert_eq!(
            client.method_url(&sub, "pull"),
            "http://localhost:8085/v1/projects/p/subscriptions/s:pull"
        );
    }

    #[test]
    fn test_message_builder() {
        let message = PubsubMessage::new("m-1")
            .with_attribute("k", "v")
            .with_data("payload");
        assert_eq!(message.attribute("k"), Some("v"));
        assert_eq!(message.decoded_data().unwrap(), b"payload");
        assert!(message.attribute("missing").is_none());
    }

    #[tokio::test]
    async fn test_mock_nack_uses_zero_deadline() {
        let service = MockPubsubService::new();
        let sub = SubscriptionName::new("p", "s").unwrap();
        service.nack(&sub, &["x".to_string()]).await.unwrap();
        assert_eq!(service.nacked(), vec!["x".to_string()]);
        assert!(service.acked().is_empty());
    }
}
