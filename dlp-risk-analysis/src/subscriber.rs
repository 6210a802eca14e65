//! Asynchronous Pub/Sub listener.
//!
//! A [`Subscriber`] runs a pool of worker tasks against one subscription.
//! Each worker pulls a batch, passes every message to the
//! [`MessageHandler`], and applies the handler's [`Reply`]: `Ack` removes
//! the message, `Nack` returns it for redelivery to this or another
//! consumer. Handlers on different workers run in parallel.
//!
//! ```rust,ignore
//! let subscriber = Subscriber::new(service, subscription, SubscriberConfig::default());
//! let handle = subscriber.start(handler);
//! // ...
//! handle.stop().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::SubscriberConfig;
use crate::error::{Result, RiskError};
use crate::pubsub::{PubsubMessage, ReceivedMessage, SharedPubsubService};
use crate::types::SubscriptionName;

/// A handler's verdict on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Processed; do not redeliver.
    Ack,
    /// Not for this handler; redeliver.
    Nack,
}

/// Callback invoked for each delivered message.
///
/// Called concurrently from several workers.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one message and decides whether to acknowledge it.
    async fn handle(&self, message: &PubsubMessage) -> Reply;
}

/// A listener bound to one subscription.
pub struct Subscriber {
    service: SharedPubsubService,
    subscription: SubscriptionName,
    config: SubscriberConfig,
}

impl Subscriber {
    /// Creates a subscriber. Nothing is pulled until [`start`](Self::start).
    pub fn new(
        service: SharedPubsubService,
        subscription: SubscriptionName,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            service,
            subscription,
            config,
        }
    }

    /// Returns the subscription this listener pulls from.
    pub fn subscription(&self) -> &SubscriptionName {
        &self.subscription
    }

    /// Starts the worker pool.
    pub fn start(&self, handler: Arc<dyn MessageHandler>) -> SubscriberHandle {
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for worker_id in 0..self.config.workers.max(1) {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&self.service),
                self.subscription.clone(),
                Arc::clone(&handler),
                self.config,
                cancel.clone(),
            ));
        }

        tracing::debug!(
            subscription = %self.subscription,
            workers = self.config.workers,
            "Subscriber started"
        );

        SubscriberHandle {
            cancel,
            workers,
            subscription: self.subscription.clone(),
        }
    }
}

/// Running listener. Dropping it cancels the workers without waiting.
pub struct SubscriberHandle {
    cancel: CancellationToken,
    workers: JoinSet<Result<()>>,
    subscription: SubscriptionName,
}

impl SubscriberHandle {
    /// Returns true once stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops pulling and waits for every worker to finish.
    ///
    /// In-flight handlers run to completion; messages pulled but not yet
    /// handled are rejected. Returns the first fatal worker error.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();

        let mut first_error = None;
        while let Some(joined) = self.workers.join_next().await {
            if let Err(error) = worker_outcome(joined, &self.subscription) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        tracing::debug!(subscription = %self.subscription, "Subscriber stopped");

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Resolves with the first worker that exits on a fatal error.
    ///
    /// Never resolves while the workers are healthy, so it is meant to be
    /// raced against other events. Cancel safe: a worker error observed here
    /// is not reported again by [`stop`](Self::stop).
    pub async fn fatal_error(&mut self) -> RiskError {
        while let Some(joined) = self.workers.join_next().await {
            if let Err(error) = worker_outcome(joined, &self.subscription) {
                return error;
            }
        }
        std::future::pending().await
    }
}

fn worker_outcome(
    joined: std::result::Result<Result<()>, JoinError>,
    subscription: &SubscriptionName,
) -> Result<()> {
    joined.unwrap_or_else(|e| {
        Err(RiskError::Subscription {
            message: format!("worker task failed: {}", e),
            subscription: Some(subscription.to_string()),
        })
    })
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    worker_id: usize,
    service: SharedPubsubService,
    subscription: SubscriptionName,
    handler: Arc<dyn MessageHandler>,
    config: SubscriberConfig,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let pull = service.pull(&subscription, config.max_messages);
        tokio::pin!(pull);

        let pulled = tokio::select! {
            result = &mut pull => result,
            _ = cancel.cancelled() => {
                // The server may already have leased a batch to this pull.
                match tokio::time::timeout(config.shutdown_grace, pull).await {
                    Ok(Ok(messages)) if !messages.is_empty() => {
                        dispatch(worker_id, &service, &subscription, &handler, &cancel, messages)
                            .await;
                    }
                    Ok(_) => {}
                    Err(_) => {
                        tracing::warn!(worker_id, "In-flight pull abandoned on shutdown");
                    }
                }
                return Ok(());
            }
        };

        match pulled {
            Ok(messages) if messages.is_empty() => {
                if idle(&cancel, config).await {
                    return Ok(());
                }
            }
            Ok(messages) => {
                dispatch(worker_id, &service, &subscription, &handler, &cancel, messages).await;
            }
            Err(error) if error.is_retriable() => {
                tracing::warn!(worker_id, error = %error, "Pull failed, retrying");
                if idle(&cancel, config).await {
                    return Ok(());
                }
            }
            Err(error) => {
                tracing::error!(worker_id, error = %error, "Pull failed, worker exiting");
                return Err(RiskError::Subscription {
                    message: format!("pull from {} failed: {}", subscription, error),
                    subscription: Some(subscription.to_string()),
                });
            }
        }
    }
}

/// Sleeps for the idle backoff. Returns true if cancelled meanwhile.
async fn idle(cancel: &CancellationToken, config: SubscriberConfig) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(config.idle_backoff) => false,
    }
}

async fn dispatch(
    worker_id: usize,
    service: &SharedPubsubService,
    subscription: &SubscriptionName,
    handler: &Arc<dyn MessageHandler>,
    cancel: &CancellationToken,
    messages: Vec<ReceivedMessage>,
) {
    let mut acks = Vec::new();
    let mut nacks = Vec::new();

    for received in messages {
        if cancel.is_cancelled() {
            nacks.push(received.ack_id);
            continue;
        }

        let reply = handler.handle(&received.message).await;
        tracing::debug!(
            worker_id,
            message_id = %received.message.message_id,
            ?reply,
            "Handled message"
        );
        match reply {
            Reply::Ack => acks.push(received.ack_id),
            Reply::Nack => nacks.push(received.ack_id),
        }
    }

    if let Err(error) = service.acknowledge(subscription, &acks).await {
        tracing::warn!(worker_id, count = acks.len(), error = %error, "Acknowledge failed");
    }
    if let Err(error) = service.nack(subscription, &nacks).await {
        tracing::warn!(worker_id, count = nacks.len(), error = %error, "Nack failed");
    }
}
