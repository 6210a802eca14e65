//! Numerical statistics risk analysis, end to end.
//!
//! [`NumericalStatsAnalysis::run`] submits one job, waits for its Pub/Sub
//! completion notification, fetches the result, and writes the report.
//! The three steps are also exposed on their own.

use std::io::Write;
use std::sync::Arc;

use crate::client::{DlpServiceClient, SharedDlpServiceClient};
use crate::config::{SubscriberConfig, WaitConfig};
use crate::completion::{wait_for_job_completion, WaitOutcome};
use crate::error::{Result, RiskError};
use crate::job::{BigQueryTable, JobState, NumericalStatsResult, RiskAnalysisJobConfig};
use crate::pubsub::SharedPubsubService;
use crate::report::write_numerical_stats;
use crate::subscriber::Subscriber;
use crate::types::{DlpJobName, ProjectName, SubscriptionName, TopicName};

/// Everything needed to run one numerical statistics analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericalStatsRequest {
    /// Project the job runs under and bills to
    pub calling_project: ProjectName,
    /// Table to analyze
    pub source_table: BigQueryTable,
    /// Column to compute statistics over
    pub column: String,
    /// Topic the service notifies on completion
    pub topic: TopicName,
    /// Subscription to that topic
    pub subscription: SubscriptionName,
}

impl NumericalStatsRequest {
    /// Builds a request from bare IDs. The topic and subscription belong
    /// to the calling project.
    pub fn new(
        calling_project_id: &str,
        table_project_id: &str,
        dataset_id: &str,
        table_id: &str,
        topic_id: &str,
        subscription_id: &str,
        column_name: &str,
    ) -> Result<Self> {
        for (label, value) in [
            ("table project", table_project_id),
            ("dataset", dataset_id),
            ("table", table_id),
            ("column", column_name),
        ] {
            if value.trim().is_empty() {
                return Err(RiskError::validation(format!("{} cannot be empty", label)));
            }
        }

        Ok(Self {
            calling_project: ProjectName::new(calling_project_id)?,
            source_table: BigQueryTable::new(table_project_id, dataset_id, table_id),
            column: column_name.to_string(),
            topic: TopicName::new(calling_project_id, topic_id)?,
            subscription: SubscriptionName::new(calling_project_id, subscription_id)?,
        })
    }

    /// Returns the job configuration submitted for this request.
    pub fn job_config(&self) -> RiskAnalysisJobConfig {
        RiskAnalysisJobConfig::numerical_stats(
            self.source_table.clone(),
            self.column.clone(),
            &self.topic,
        )
    }
}

/// Submits the numerical statistics job and returns its name.
///
/// Failures are returned as [`RiskError::Submission`]; nothing is retried.
pub async fn submit_numerical_stats_job(
    client: &dyn DlpServiceClient,
    request: &NumericalStatsRequest,
) -> Result<DlpJobName> {
    let job = client
        .create_dlp_job(&request.calling_project, request.job_config())
        .await
        .map_err(|e| RiskError::Submission {
            message: e.to_string(),
            api_error: e.api_error().cloned(),
        })?;

    tracing::info!(
        job = %job.name,
        table = %request.source_table,
        column = %request.column,
        "Submitted numerical stats job"
    );
    Ok(job.name)
}

/// Fetches a finished job and extracts its numerical statistics.
///
/// The job must be `DONE`. Nothing is retried.
pub async fn fetch_numerical_stats(
    client: &dyn DlpServiceClient,
    name: &DlpJobName,
) -> Result<NumericalStatsResult> {
    let job = client.get_dlp_job(name).await?;

    match job.state {
        JobState::Done => {}
        JobState::Failed => {
            return Err(RiskError::JobFailed {
                job: name.to_string(),
                errors: job.error_messages(),
            });
        }
        state => {
            return Err(RiskError::JobIncomplete {
                job: name.to_string(),
                state,
            });
        }
    }

    job.numerical_stats_result()
        .cloned()
        .ok_or_else(|| RiskError::MissingResult {
            job: name.to_string(),
        })
}

/// Runs numerical statistics analyses against the DLP and Pub/Sub services.
pub struct NumericalStatsAnalysis {
    dlp: SharedDlpServiceClient,
    pubsub: SharedPubsubService,
    wait_config: WaitConfig,
    subscriber_config: SubscriberConfig,
}

impl NumericalStatsAnalysis {
    /// Creates an analysis runner with default wait and listener settings.
    pub fn new(dlp: SharedDlpServiceClient, pubsub: SharedPubsubService) -> Self {
        Self {
            dlp,
            pubsub,
            wait_config: WaitConfig::default(),
            subscriber_config: SubscriberConfig::default(),
        }
    }

    /// Overrides the completion wait settings.
    pub fn with_wait_config(mut self, wait_config: WaitConfig) -> Self {
        self.wait_config = wait_config;
        self
    }

    /// Overrides the listener settings.
    pub fn with_subscriber_config(mut self, subscriber_config: SubscriberConfig) -> Self {
        self.subscriber_config = subscriber_config;
        self
    }

    /// Submits the job, waits for completion, fetches the statistics, and
    /// writes the report to `out`.
    ///
    /// A wait timeout does not stop the flow; the fetch then reports
    /// whatever state the job is in.
    pub async fn run<W: Write>(
        &self,
        request: &NumericalStatsRequest,
        out: &mut W,
    ) -> Result<NumericalStatsResult> {
        let job = submit_numerical_stats_job(self.dlp.as_ref(), request).await?;

        let subscriber = Subscriber::new(
            Arc::clone(&self.pubsub),
            request.subscription.clone(),
            self.subscriber_config,
        );
        let outcome = wait_for_job_completion(&subscriber, &job, &self.wait_config).await?;
        if outcome == WaitOutcome::TimedOut {
            tracing::warn!(job = %job, "Results may be incomplete");
        }

        let result = fetch_numerical_stats(self.dlp.as_ref(), &job).await?;
        write_numerical_stats(&result, out)?;
        Ok(result)
    }
}
