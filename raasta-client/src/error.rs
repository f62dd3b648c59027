//! Error types for raasta-client
//!
//! Callers render these directly; none of them expose transport internals.

use thiserror::Error;

/// Failure of a submission or engagement call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The draft is incomplete; nothing was sent
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Request timed out. Please check your connection and try again.")]
    Timeout,

    /// 5xx from the server after all attempts
    #[error("Server error occurred: {message}")]
    Server { status: u16, message: String },

    #[error("Network error - please check your connection")]
    Network,

    /// 4xx other than 401; the server refused the request as sent
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Session expired - please login again")]
    Unauthorized,

    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("An error occurred: {0}")]
    Unknown(String),

    /// The caller abandoned the submission
    #[error("Submission cancelled")]
    Cancelled,
}

impl SubmitError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubmitError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed
    ///
    /// Timeouts, connection failures and 5xx answers are transient. Anything the server
    /// answered with a 4xx has already been judged and is surfaced as is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitError::Timeout | SubmitError::Network | SubmitError::Server { .. }
        )
    }

    /// Classify an HTTP error status and the server's message
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => SubmitError::Unauthorized,
            429 => SubmitError::RateLimited,
            500..=599 => SubmitError::Server { status, message },
            400..=499 => SubmitError::Rejected { status, message },
            _ => SubmitError::Unknown(format!("unexpected status {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmitError::Timeout
        } else if err.is_connect() {
            SubmitError::Network
        } else if let Some(status) = err.status() {
            SubmitError::from_status(status.as_u16(), err.to_string())
        } else if err.is_request() || err.is_body() {
            // Connection dropped mid-request
            SubmitError::Network
        } else {
            SubmitError::Unknown(err.to_string())
        }
    }
}

impl From<raasta_common::Error> for SubmitError {
    fn from(err: raasta_common::Error) -> Self {
        match err {
            raasta_common::Error::Validation { field, message } => {
                SubmitError::Validation { field, message }
            }
            other => SubmitError::Unknown(other.to_string()),
        }
    }
}
