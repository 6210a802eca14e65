//! Waiting for a DLP job-completion notification.
//!
//! The DLP service publishes a message carrying the job name in its
//! `DlpJobName` attribute when a job finishes. [`wait_for_job_completion`]
//! listens on a subscription for that message, acknowledging it and
//! rejecting everything else, and gives up quietly after a timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::{WaitConfig, JOB_NAME_ATTRIBUTE};
use crate::error::Result;
use crate::pubsub::PubsubMessage;
use crate::subscriber::{MessageHandler, Reply, Subscriber};
use crate::types::DlpJobName;

/// A one-shot event that many tasks may set and any task may wait on.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    fired: AtomicBool,
    notify: Notify,
}

impl CompletionSignal {
    /// Creates an unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal. Returns true only for the call that set it.
    pub fn set(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Returns true once the signal has been set.
    pub fn is_set(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is set, immediately if it already is.
    pub async fn wait(&self) {
        loop {
            // Register before checking so a concurrent `set` is not missed.
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// Acknowledges the completion message of one job and rejects all others.
pub struct JobCompletionHandler {
    job: DlpJobName,
    signal: Arc<CompletionSignal>,
    settle_delay: Duration,
}

impl JobCompletionHandler {
    /// Creates a handler for `job` that sets `signal` on a match.
    pub fn new(job: DlpJobName, signal: Arc<CompletionSignal>, settle_delay: Duration) -> Self {
        Self {
            job,
            signal,
            settle_delay,
        }
    }

    /// Returns true if the message announces this handler's job.
    pub fn matches(&self, message: &PubsubMessage) -> bool {
        message.attribute(JOB_NAME_ATTRIBUTE) == Some(self.job.as_str())
    }
}

#[async_trait]
impl MessageHandler for JobCompletionHandler {
    async fn handle(&self, message: &PubsubMessage) -> Reply {
        if !self.matches(message) {
            tracing::debug!(
                job = %self.job,
                message_id = %message.message_id,
                "Ignoring notification for another job"
            );
            return Reply::Nack;
        }

        // Job results become readable shortly after the notification.
        tokio::time::sleep(self.settle_delay).await;
        if self.signal.set() {
            tracing::info!(job = %self.job, message_id = %message.message_id, "Job completion received");
        }
        Reply::Ack
    }
}

/// How a completion wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The job's notification arrived.
    Completed,
    /// The timeout elapsed first.
    TimedOut,
}

impl WaitOutcome {
    /// Returns true if the notification arrived.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Listens on `subscriber` until `job`'s completion notification arrives or
/// `config.timeout` elapses, then stops the listener.
///
/// A timeout is not an error: it is logged and reported as
/// [`WaitOutcome::TimedOut`] so the caller can go on to fetch the job.
/// A fatal listener error (for example a missing subscription) ends the
/// wait as soon as a worker hits it.
pub async fn wait_for_job_completion(
    subscriber: &Subscriber,
    job: &DlpJobName,
    config: &WaitConfig,
) -> Result<WaitOutcome> {
    let signal = Arc::new(CompletionSignal::new());
    let handler = Arc::new(JobCompletionHandler::new(
        job.clone(),
        Arc::clone(&signal),
        config.settle_delay,
    ));

    let mut handle = subscriber.start(handler);

    let outcome = tokio::select! {
        _ = signal.wait() => WaitOutcome::Completed,
        _ = tokio::time::sleep(config.timeout) => {
            tracing::warn!(
                job = %job,
                timeout_secs = config.timeout.as_secs(),
                "No completion notification before timeout; fetching anyway"
            );
            WaitOutcome::TimedOut
        }
        error = handle.fatal_error() => {
            tracing::error!(job = %job, error = %error, "Listener failed while waiting");
            if let Err(other) = handle.stop().await {
                tracing::debug!(error = %other, "Further listener error on stop");
            }
            return Err(error);
        }
    };

    handle.stop().await?;
    Ok(outcome)
}
