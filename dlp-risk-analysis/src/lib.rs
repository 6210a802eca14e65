//! # DLP numerical statistics risk analysis
//!
//! This crate runs a Cloud DLP numerical-statistics risk analysis over one
//! BigQuery column and reports the column's range and quantile boundaries.
//!
//! ## Overview
//!
//! A run has three steps:
//!
//! 1. **Submit** a risk analysis job whose only action publishes a
//!    notification to a Pub/Sub topic when the job finishes.
//! 2. **Wait** on a subscription to that topic for the message whose
//!    `DlpJobName` attribute names the job. Other messages are rejected so
//!    they stay available to other consumers. The wait is bounded by a
//!    timeout (10 minutes by default); hitting it is not an error.
//! 3. **Fetch** the job by name, extract its [`NumericalStatsResult`], and
//!    print it.
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dlp_risk_analysis::{
//!     ClientConfig, HttpDlpServiceClient, HttpPubsubClient, NumericalStatsAnalysis,
//!     NumericalStatsRequest, StaticTokenProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dlp_risk_analysis::RiskError> {
//!     let token = Arc::new(StaticTokenProvider::from_env()?);
//!     let config = ClientConfig::default();
//!     let analysis = NumericalStatsAnalysis::new(
//!         Arc::new(HttpDlpServiceClient::new(token.clone(), config.clone())?),
//!         Arc::new(HttpPubsubClient::new(token, config)?),
//!     );
//!
//!     let request = NumericalStatsRequest::new(
//!         "my-project", "bigquery-public-data", "samples", "natality",
//!         "dlp-done", "dlp-done-sub", "mother_age",
//!     )?;
//!     analysis.run(&request, &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```
//!
//! Output looks like:
//!
//! ```text
//! Value Range: [12, 50]
//! Value at 1% quantile: 12
//! Value at 2% quantile: 15
//! ...
//! ```
//!
//! ## Value wrappers
//!
//! Every statistic arrives as a tagged scalar such as
//! `{"integerValue": "42"}`. [`Value::unpack`] returns the scalar's text
//! (`42`), which is what the report prints.

pub mod analysis;
pub mod auth;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod job;
pub mod pubsub;
pub mod report;
mod rest;
pub mod subscriber;
pub mod types;
pub mod value;

pub use analysis::{
    fetch_numerical_stats, submit_numerical_stats_job, NumericalStatsAnalysis,
    NumericalStatsRequest,
};
pub use auth::{MetadataTokenProvider, SharedTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{DlpServiceClient, HttpDlpServiceClient, SharedDlpServiceClient};
pub use completion::{wait_for_job_completion, CompletionSignal, JobCompletionHandler, WaitOutcome};
pub use config::{
    ClientConfig, SubscriberConfig, WaitConfig, DEFAULT_SETTLE_DELAY, DEFAULT_WAIT_TIMEOUT,
    JOB_NAME_ATTRIBUTE,
};
pub use error::{ApiError, Result, RiskError};
pub use job::{
    BigQueryTable, DlpJob, JobState, NumericalStatsResult, RiskAnalysisJobConfig,
};
pub use pubsub::{HttpPubsubClient, PubsubMessage, PubsubService, ReceivedMessage, SharedPubsubService};
pub use report::{format_numerical_stats, write_numerical_stats};
pub use subscriber::{MessageHandler, Reply, Subscriber, SubscriberHandle};
pub use types::{DlpJobName, ProjectName, SubscriptionName, TopicName, ValidationError};
pub use value::{unpack_value, Value, ValueKind};
