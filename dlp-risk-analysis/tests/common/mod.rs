//! Shared test utilities for integration tests.
//!
//! This module provides mock DLP and Pub/Sub services and fixture builders
//! used across the integration tests.

#![allow(dead_code)] // These utilities are used by other integration test files

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dlp_risk_analysis::{
    DlpJob, DlpJobName, DlpServiceClient, JobState, NumericalStatsRequest, NumericalStatsResult,
    ProjectName, PubsubMessage, PubsubService, ReceivedMessage, RiskAnalysisJobConfig, RiskError,
    SubscriptionName, Value, JOB_NAME_ATTRIBUTE,
};

pub const TEST_JOB_NAME: &str = "projects/calling/dlpJobs/r-42";
pub const OTHER_JOB_NAME: &str = "projects/calling/dlpJobs/r-7";

// =============================================================================
// Mock DLP client
// =============================================================================

/// A mock DlpServiceClient with queued responses and call recording.
pub struct MockDlpServiceClient {
    create_responses: Mutex<VecDeque<Result<DlpJob, RiskError>>>,
    get_responses: Mutex<VecDeque<Result<DlpJob, RiskError>>>,
    create_calls: Mutex<Vec<RiskAnalysisJobConfig>>,
    get_calls: AtomicUsize,
}

impl MockDlpServiceClient {
    pub fn new() -> Self {
        Self {
            create_responses: Mutex::new(VecDeque::new()),
            get_responses: Mutex::new(VecDeque::new()),
            create_calls: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_create_response(self, response: Result<DlpJob, RiskError>) -> Self {
        self.create_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_get_response(self, response: Result<DlpJob, RiskError>) -> Self {
        self.get_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn create_calls(&self) -> Vec<RiskAnalysisJobConfig> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DlpServiceClient for MockDlpServiceClient {
    async fn create_dlp_job(
        &self,
        _parent: &ProjectName,
        risk_job: RiskAnalysisJobConfig,
    ) -> Result<DlpJob, RiskError> {
        self.create_calls.lock().unwrap().push(risk_job);
        self.create_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(pending_job()))
    }

    async fn get_dlp_job(&self, name: &DlpJobName) -> Result<DlpJob, RiskError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.get_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RiskError::not_found("Job not found", name.as_str())))
    }
}

// =============================================================================
// Mock Pub/Sub service
// =============================================================================

/// A mock PubsubService serving queued pulls and recording replies.
pub struct MockPubsubService {
    pulls: Mutex<VecDeque<Result<Vec<ReceivedMessage>, RiskError>>>,
    acked: Mutex<Vec<String>>,
    nacked: Mutex<Vec<String>>,
    pull_count: AtomicUsize,
}

impl MockPubsubService {
    pub fn new() -> Self {
        Self {
            pulls: Mutex::new(VecDeque::new()),
            acked: Mutex::new(Vec::new()),
            nacked: Mutex::new(Vec::new()),
            pull_count: AtomicUsize::new(0),
        }
    }

    pub fn with_messages(self, messages: Vec<ReceivedMessage>) -> Self {
        self.pulls.lock().unwrap().push_back(Ok(messages));
        self
    }

    pub fn with_pull_error(self, error: RiskError) -> Self {
        self.pulls.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn nacked(&self) -> Vec<String> {
        self.nacked.lock().unwrap().clone()
    }

    pub fn pull_count(&self) -> usize {
        self.pull_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PubsubService for MockPubsubService {
    async fn pull(
        &self,
        _subscription: &SubscriptionName,
        _max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, RiskError> {
        self.pull_count.fetch_add(1, Ordering::SeqCst);
        self.pulls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn acknowledge(
        &self,
        _subscription: &SubscriptionName,
        ack_ids: &[String],
    ) -> Result<(), RiskError> {
        self.acked.lock().unwrap().extend_from_slice(ack_ids);
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        _subscription: &SubscriptionName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<(), RiskError> {
        if ack_deadline_seconds == 0 {
            self.nacked.lock().unwrap().extend_from_slice(ack_ids);
        }
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn test_request() -> NumericalStatsRequest {
    NumericalStatsRequest::new(
        "calling",
        "bigquery-public-data",
        "samples",
        "natality",
        "dlp-done",
        "dlp-done-sub",
        "mother_age",
    )
    .unwrap()
}

pub fn job_name() -> DlpJobName {
    DlpJobName::new(TEST_JOB_NAME).unwrap()
}

pub fn pending_job() -> DlpJob {
    DlpJob::new(job_name(), JobState::Pending)
}

pub fn done_job(result: NumericalStatsResult) -> DlpJob {
    DlpJob::new(job_name(), JobState::Done).with_numerical_stats(result)
}

pub fn integer_stats(min: i64, max: i64, quantiles: &[i64]) -> NumericalStatsResult {
    NumericalStatsResult {
        min_value: Value::integer(min),
        max_value: Value::integer(max),
        quantile_values: quantiles.iter().map(|q| Value::integer(*q)).collect(),
    }
}

pub fn notification(ack_id: &str, job: &str) -> ReceivedMessage {
    ReceivedMessage::new(
        ack_id,
        PubsubMessage::new(format!("msg-{}", ack_id)).with_attribute(JOB_NAME_ATTRIBUTE, job),
    )
}
