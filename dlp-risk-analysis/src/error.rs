//! Error types for the DLP risk analysis client.
//!
//! This module defines the error hierarchy shared by the DLP job client,
//! the Pub/Sub subscriber, and the value decoding used when reading
//! numerical statistics results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobState;

/// Convenience alias used throughout the crate.
pub type Result<T, E = RiskError> = std::result::Result<T, E>;

/// The main error type for the DLP risk analysis client.
#[derive(Debug, Error)]
pub enum RiskError {
    /// The risk analysis job could not be submitted.
    #[error("Submission error: {message}")]
    Submission {
        /// Error message describing what went wrong
        message: String,
        /// Optional underlying API error details
        api_error: Option<ApiError>,
    },

    /// A Google API call returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Error message describing what went wrong
        message: String,
        /// Whether the call may succeed if repeated
        is_retriable: bool,
        /// Optional underlying API error details
        api_error: Option<ApiError>,
    },

    /// The service rejected the call because of rate limiting.
    #[error("Throttled: {message}")]
    Throttling {
        /// Error message describing the throttling
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was missing
        message: String,
        /// The resource name if known
        resource: Option<String>,
    },

    /// The job exists but has not reached the `DONE` state.
    #[error("Job {job} is not complete (state {state})")]
    JobIncomplete {
        /// The job name
        job: String,
        /// The state the job was in when fetched
        state: JobState,
    },

    /// The job finished in the `FAILED` state.
    #[error("Job {job} failed: {}", .errors.join("; "))]
    JobFailed {
        /// The job name
        job: String,
        /// Error messages reported by the service
        errors: Vec<String>,
    },

    /// The job completed without a numerical statistics result.
    #[error("Job {job} has no numerical statistics result")]
    MissingResult {
        /// The job name
        job: String,
    },

    /// The Pub/Sub listener failed.
    #[error("Subscription error: {message}")]
    Subscription {
        /// Error message describing the failure
        message: String,
        /// The subscription name if known
        subscription: Option<String>,
    },

    /// Validation error for invalid configuration or resource names.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation failure
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerDes {
        /// Error message describing the serialization failure
        message: String,
    },

    /// An access token could not be obtained.
    #[error("Credentials error: {message}")]
    Credentials {
        /// Error message describing the failure
        message: String,
    },

    /// Writing the report failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the writer
        message: String,
    },
}

impl RiskError {
    /// Creates a new Submission error.
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
            api_error: None,
        }
    }

    /// Creates a new Subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
            subscription: None,
        }
    }

    /// Creates a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new SerDes error.
    pub fn serdes(message: impl Into<String>) -> Self {
        Self::SerDes {
            message: message.into(),
        }
    }

    /// Creates a new Credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Creates a new NotFound error for the given resource.
    pub fn not_found(message: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource: Some(resource.into()),
        }
    }

    /// Returns true if repeating the failed call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Throttling { .. } | Self::Api { is_retriable: true, .. }
        )
    }

    /// Returns true if this is a Throttling error.
    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttling { .. })
    }

    /// Returns true if the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the structured API error details, if the service sent any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { api_error, .. } | Self::Submission { api_error, .. } => api_error.as_ref(),
            _ => None,
        }
    }

    /// Returns the HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Throttling { .. } => Some(429),
            _ => None,
        }
    }

    /// Maps a non-success HTTP response to an error.
    ///
    /// `resource` names the object the call addressed and is reported on
    /// 404 responses.
    pub(crate) fn from_status(status: u16, body: &str, resource: &str) -> Self {
        let api_error = ApiError::from_body(body);
        let message = api_error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| body.to_string());

        match status {
            404 => Self::NotFound {
                message,
                resource: Some(resource.to_string()),
            },
            429 => Self::Throttling { message },
            _ => Self::Api {
                status,
                message,
                is_retriable: status >= 500,
                api_error,
            },
        }
    }
}

/// Error details from a Google API error payload.
///
/// Google APIs return `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// The numeric error code
    pub code: i32,
    /// The error message
    #[serde(default)]
    pub message: String,
    /// The canonical status name, e.g. `PERMISSION_DENIED`
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

impl ApiError {
    /// Parses an API error from a response body, if it has the standard shape.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerDes {
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for RiskError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
