//! Newtype wrappers for Google Cloud resource names.
//!
//! The DLP and Pub/Sub APIs address everything through slash-separated
//! resource names. These types keep project, topic, subscription, and job
//! names apart at compile time and validate their shape when parsed.
//!
//! # Example
//!
//! ```rust
//! use dlp_risk_analysis::types::{DlpJobName, ProjectName, SubscriptionName, TopicName};
//!
//! let project = ProjectName::new("my-project").unwrap();
//! assert_eq!(project.to_string(), "projects/my-project");
//!
//! let topic = TopicName::new("my-project", "dlp-done").unwrap();
//! assert_eq!(topic.to_string(), "projects/my-project/topics/dlp-done");
//!
//! let subscription: SubscriptionName = "projects/my-project/subscriptions/dlp-sub".parse().unwrap();
//! assert_eq!(subscription.subscription(), "dlp-sub");
//!
//! let job = DlpJobName::new("projects/my-project/dlpJobs/r-123").unwrap();
//! assert_eq!(job.job_id(), "r-123");
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when resource name validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The type name that failed validation
    pub type_name: &'static str,
    /// Description of the validation failure
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for crate::error::RiskError {
    fn from(error: ValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

/// Checks a single resource-name segment: non-empty and free of slashes.
fn validate_segment(
    type_name: &'static str,
    label: &str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError {
            type_name,
            message: format!("{} cannot be empty", label),
        });
    }
    if value.contains('/') {
        return Err(ValidationError {
            type_name,
            message: format!("{} must not contain '/': {}", label, value),
        });
    }
    Ok(())
}

/// Splits `projects/{project}/{collection}/{id}` into `(project, id)`.
fn split_name<'a>(
    type_name: &'static str,
    collection: &str,
    value: &'a str,
) -> Result<(&'a str, &'a str), ValidationError> {
    let parts: Vec<&str> = value.split('/').collect();
    match parts.as_slice() {
        ["projects", project, c, id] if *c == collection => {
            validate_segment(type_name, "project", project)?;
            validate_segment(type_name, "id", id)?;
            Ok((*project, *id))
        }
        _ => Err(ValidationError {
            type_name,
            message: format!(
                "expected projects/{{project}}/{}/{{id}}, got {}",
                collection, value
            ),
        }),
    }
}

/// A Google Cloud project, rendered as `projects/{project_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates a new `ProjectName` from a bare project ID.
    pub fn new(project_id: impl Into<String>) -> Result<Self, ValidationError> {
        let project_id = project_id.into();
        validate_segment("ProjectName", "project", &project_id)?;
        Ok(Self(project_id))
    }

    /// Returns the bare project ID.
    #[inline]
    pub fn project_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}", self.0)
    }
}

/// A Pub/Sub topic, rendered as `projects/{project}/topics/{topic}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicName {
    project: String,
    topic: String,
}

impl TopicName {
    /// Creates a new `TopicName` from its parts.
    pub fn new(project: impl Into<String>, topic: impl Into<String>) -> Result<Self, ValidationError> {
        let project = project.into();
        let topic = topic.into();
        validate_segment("TopicName", "project", &project)?;
        validate_segment("TopicName", "topic", &topic)?;
        Ok(Self { project, topic })
    }

    /// Returns the project that owns the topic.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the bare topic ID.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/topics/{}", self.project, self.topic)
    }
}

impl FromStr for TopicName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (project, topic) = split_name("TopicName", "topics", s)?;
        Self::new(project, topic)
    }
}

/// A Pub/Sub subscription, rendered as `projects/{project}/subscriptions/{subscription}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionName {
    project: String,
    subscription: String,
}

impl SubscriptionName {
    /// Creates a new `SubscriptionName` from its parts.
    pub fn new(
        project: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let project = project.into();
        let subscription = subscription.into();
        validate_segment("SubscriptionName", "project", &project)?;
        validate_segment("SubscriptionName", "subscription", &subscription)?;
        Ok(Self {
            project,
            subscription,
        })
    }

    /// Returns the project that owns the subscription.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the bare subscription ID.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/subscriptions/{}", self.project, self.subscription)
    }
}

impl FromStr for SubscriptionName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (project, subscription) = split_name("SubscriptionName", "subscriptions", s)?;
        Self::new(project, subscription)
    }
}

/// The name the DLP service assigns to a submitted job.
///
/// Job names look like `projects/{project}/dlpJobs/{job_id}` or, for
/// regional jobs, `projects/{project}/locations/{location}/dlpJobs/{job_id}`.
/// The name is the correlation key carried in the `DlpJobName` attribute of
/// completion notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DlpJobName(String);

impl DlpJobName {
    /// Creates a new `DlpJobName` with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Creates a new `DlpJobName` without validation.
    #[inline]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string value.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns a reference to the inner string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the project segment of the name.
    pub fn project(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }

    /// Returns the trailing job ID segment of the name.
    pub fn job_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    fn validate(value: &str) -> Result<(), ValidationError> {
        let parts: Vec<&str> = value.split('/').collect();
        let well_formed = match parts.as_slice() {
            ["projects", project, "dlpJobs", id] => !project.is_empty() && !id.is_empty(),
            ["projects", project, "locations", location, "dlpJobs", id] => {
                !project.is_empty() && !location.is_empty() && !id.is_empty()
            }
            _ => false,
        };
        if !well_formed {
            return Err(ValidationError {
                type_name: "DlpJobName",
                message: format!(
                    "expected projects/{{project}}[/locations/{{location}}]/dlpJobs/{{id}}, got {}",
                    value
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for DlpJobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for DlpJobName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for DlpJobName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DlpJobName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq<str> for DlpJobName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
