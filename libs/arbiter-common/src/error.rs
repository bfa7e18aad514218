use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the remote execution client.
///
/// `UnsupportedLanguage` and `EmptySource` are caller input errors and are
/// raised before anything is dispatched. The rest describe the backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("Unsupported language ID: {id}. Supported languages: {supported}")]
    UnsupportedLanguage { id: u32, supported: String },

    #[error("Source code cannot be empty")]
    EmptySource,

    #[error("Submission not found - token may be invalid or expired: {0}")]
    NotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Execution backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Retry budget exhausted after {attempts} attempts: {last}")]
    RetryBudgetExhausted { attempts: u32, last: String },
}

impl ClientError {
    /// Input errors are never worth dispatching or retrying
    pub fn is_input_error(&self) -> bool {
        matches!(self, ClientError::UnsupportedLanguage { .. } | ClientError::EmptySource)
    }

    /// Errors that send a submission to the fallback executor
    pub fn routes_to_fallback(&self) -> bool {
        matches!(self, ClientError::BackendUnavailable(_) | ClientError::Timeout(_))
    }

    /// Errors that end a poll loop without spending the rest of the budget
    pub fn is_terminal_for_poll(&self) -> bool {
        matches!(self, ClientError::NotFound(_) | ClientError::BackendUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("At least one test case is required")]
    EmptyTestCases,

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
