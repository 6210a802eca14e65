//! DLP job model.
//!
//! These types mirror the JSON representation of the DLP v2 REST API for
//! risk analysis jobs: the job configuration sent on submission, and the
//! `DlpJob` resource returned by create and get calls.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DlpJobName, TopicName};
use crate::value::Value;

/// A column reference inside a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldId {
    /// The column name
    pub name: String,
}

/// A BigQuery table location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigQueryTable {
    /// Project that owns the table
    pub project_id: String,
    /// Dataset containing the table
    pub dataset_id: String,
    /// Table ID
    pub table_id: String,
}

impl BigQueryTable {
    /// Creates a new table reference.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for BigQueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Numerical statistics over a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericalStatsConfig {
    /// The column to compute statistics over
    pub field: FieldId,
}

/// The privacy metric a risk analysis job computes.
///
/// Only numerical statistics are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyMetric {
    /// Numerical statistics configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numerical_stats_config: Option<NumericalStatsConfig>,
}

/// Publishes a notification to a Pub/Sub topic when the job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishToPubSub {
    /// Full topic name, `projects/{project}/topics/{topic}`
    pub topic: String,
}

/// An action the service runs when the job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Pub/Sub publish action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_sub: Option<PublishToPubSub>,
}

impl Action {
    /// Creates a publish-to-Pub/Sub action for the given topic.
    pub fn publish_to(topic: &TopicName) -> Self {
        Self {
            pub_sub: Some(PublishToPubSub {
                topic: topic.to_string(),
            }),
        }
    }
}

/// Configuration of a risk analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysisJobConfig {
    /// The metric to compute
    pub privacy_metric: PrivacyMetric,
    /// The table to analyze
    pub source_table: BigQueryTable,
    /// Actions to run on completion
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl RiskAnalysisJobConfig {
    /// Builds a numerical statistics job over `column` with a single
    /// Pub/Sub notification action.
    pub fn numerical_stats(
        source_table: BigQueryTable,
        column: impl Into<String>,
        topic: &TopicName,
    ) -> Self {
        Self {
            privacy_metric: PrivacyMetric {
                numerical_stats_config: Some(NumericalStatsConfig {
                    field: FieldId {
                        name: column.into(),
                    },
                }),
            },
            source_table,
            actions: vec![Action::publish_to(topic)],
        }
    }
}

/// Request body of `projects.dlpJobs.create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDlpJobRequest {
    /// The risk analysis job to run
    pub risk_job: RiskAnalysisJobConfig,
}

/// The lifecycle state of a DLP job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Not yet started
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Done,
    /// Cancelled by a user
    Canceled,
    /// Finished with errors
    Failed,
    /// Trigger-only state
    Active,
    /// Unused, or a state this client does not know
    #[default]
    #[serde(rename = "JOB_STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl JobState {
    /// Returns true if the job will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Canceled | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "JOB_STATE_UNSPECIFIED",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Canceled => "CANCELED",
            Self::Failed => "FAILED",
            Self::Active => "ACTIVE",
        };
        f.write_str(name)
    }
}

/// Statistics computed over a numerical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericalStatsResult {
    /// Smallest value in the column
    pub min_value: Value,
    /// Largest value in the column
    pub max_value: Value,
    /// Quantile boundaries, in order
    #[serde(default)]
    pub quantile_values: Vec<Value>,
}

/// Result of a risk analysis job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDataSourceRiskDetails {
    /// The metric the job was asked to compute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_privacy_metric: Option<PrivacyMetric>,
    /// The table the job analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_source_table: Option<BigQueryTable>,
    /// Numerical statistics, when that metric was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numerical_stats_result: Option<NumericalStatsResult>,
}

/// Status payload of a job error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// gRPC status code
    #[serde(default)]
    pub code: i32,
    /// Developer-facing message
    #[serde(default)]
    pub message: String,
}

/// An error the service recorded while running the job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// The error status
    #[serde(default)]
    pub details: Status,
    /// When the error occurred
    #[serde(default)]
    pub timestamps: Vec<String>,
}

/// A DLP job resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlpJob {
    /// Server-assigned job name
    pub name: DlpJobName,
    /// Job type, e.g. `RISK_ANALYSIS_JOB`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    /// Current state
    #[serde(default)]
    pub state: JobState,
    /// Risk analysis result once the job is done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_details: Option<AnalyzeDataSourceRiskDetails>,
    /// Creation time, RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Completion time, RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Errors encountered while running the job
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JobError>,
    /// Free-form labels
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl DlpJob {
    /// Creates a job with the given name and state and no result.
    pub fn new(name: DlpJobName, state: JobState) -> Self {
        Self {
            name,
            job_type: Some("RISK_ANALYSIS_JOB".to_string()),
            state,
            risk_details: None,
            create_time: None,
            end_time: None,
            errors: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Attaches a numerical statistics result.
    pub fn with_numerical_stats(mut self, result: NumericalStatsResult) -> Self {
        self.risk_details = Some(AnalyzeDataSourceRiskDetails {
            numerical_stats_result: Some(result),
            ..Default::default()
        });
        self
    }

    /// Returns the numerical statistics result, if present.
    pub fn numerical_stats_result(&self) -> Option<&NumericalStatsResult> {
        self.risk_details
            .as_ref()
            .and_then(|details| details.numerical_stats_result.as_ref())
    }

    /// Returns the messages of the errors the service recorded.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| e.details.message.clone())
            .collect()
    }
}
