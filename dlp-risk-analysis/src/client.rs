//! Service client for the Cloud DLP API.
//!
//! This module defines the `DlpServiceClient` trait and an HTTP
//! implementation that talks to the DLP v2 REST API
//! (`projects.dlpJobs.create` and `projects.dlpJobs.get`).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::auth::SharedTokenProvider;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::job::{CreateDlpJobRequest, DlpJob, RiskAnalysisJobConfig};
use crate::rest::RestTransport;
use crate::types::{DlpJobName, ProjectName};

/// Trait for communicating with the DLP job service.
///
/// This trait abstracts the transport, allowing for different
/// implementations (e.g., the REST client, mock clients for testing).
#[async_trait]
pub trait DlpServiceClient: Send + Sync {
    /// Submits a risk analysis job under `parent`.
    ///
    /// # Returns
    ///
    /// The created job, whose `name` identifies it from then on.
    async fn create_dlp_job(
        &self,
        parent: &ProjectName,
        risk_job: RiskAnalysisJobConfig,
    ) -> Result<DlpJob>;

    /// Looks up a job by name.
    async fn get_dlp_job(&self, name: &DlpJobName) -> Result<DlpJob>;
}

/// Type alias for a shared DlpServiceClient.
pub type SharedDlpServiceClient = Arc<dyn DlpServiceClient>;

/// REST implementation of the DlpServiceClient.
pub struct HttpDlpServiceClient {
    transport: RestTransport,
    config: ClientConfig,
}

impl HttpDlpServiceClient {
    /// Creates a client with the given credentials and configuration.
    pub fn new(token_provider: SharedTokenProvider, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: RestTransport::new(token_provider, config.request_timeout)?,
            config,
        })
    }

    /// Returns the URL of a v2 resource.
    fn resource_url(&self, resource: &str) -> String {
        format!("{}/v2/{}", self.config.dlp_endpoint, resource)
    }
}

#[async_trait]
impl DlpServiceClient for HttpDlpServiceClient {
    async fn create_dlp_job(
        &self,
        parent: &ProjectName,
        risk_job: RiskAnalysisJobConfig,
    ) -> Result<DlpJob> {
        let uri = format!("{}/dlpJobs", self.resource_url(&parent.to_string()));
        let body = CreateDlpJobRequest { risk_job };
        self.transport
            .send(Method::POST, &uri, Some(&body), &parent.to_string())
            .await
    }

    async fn get_dlp_job(&self, name: &DlpJobName) -> Result<DlpJob> {
        let uri = self.resource_url(name.as_str());
        self.transport
            .send::<(), _>(Method::GET, &uri, None, name.as_str())
            .await
    }
}

/// A mock implementation of DlpServiceClient for testing.
#[cfg(test)]
pub struct MockDlpServiceClient {
    create_responses: std::sync::Mutex<Vec<Result<DlpJob>>>,
    get_responses: std::sync::Mutex<Vec<Result<DlpJob>>>,
    create_calls: std::sync::Mutex<Vec<(ProjectName, RiskAnalysisJobConfig)>>,
    get_calls: std::sync::Mutex<Vec<DlpJobName>>,
}

#[cfg(test)]
impl MockDlpServiceClient {
    pub fn new() -> Self {
        Self {
            create_responses: std::sync::Mutex::new(Vec::new()),
            get_responses: std::sync::Mutex::new(Vec::new()),
            create_calls: std::sync::Mutex::new(Vec::new()),
            get_calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_create_response(self, response: Result<DlpJob>) -> Self {
        self.create_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_get_response(self, response: Result<DlpJob>) -> Self {
        self.get_responses.lock().unwrap().push(response);
        self
    }

    pub fn create_calls(&self) -> Vec<(ProjectName, RiskAnalysisJobConfig)> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> Vec<DlpJobName> {
        self.get_calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl DlpServiceClient for MockDlpServiceClient {
    async fn create_dlp_job(
        &self,
        parent: &ProjectName,
        risk_job: RiskAnalysisJobConfig,
    ) -> Result<DlpJob> {
        self.create_calls
            .lock()
            .unwrap()
            .push((parent.clone(), risk_job));
        let mut responses = self.create_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(DlpJob::new(
                DlpJobName::new_unchecked(format!("{}/dlpJobs/mock-job", parent)),
                crate::job::JobState::Pending,
            ))
        } else {
            responses.remove(0)
        }
    }

    async fn get_dlp_job(&self, name: &DlpJobName) -> Result<DlpJob> {
        self.get_calls.lock().unwrap().push(name.clone());
        let mut responses = self.get_responses.lock().unwrap();
        if responses.is_empty() {
            Err(crate::error::RiskError::not_found("Job not found", name.as_str()))
        } else {
            responses.remove(0)
        }
    }
}
