use thiserror::Error;

/// Errors emitted by judgment providers and their callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Raised when a judgment request is malformed or missing required fields.
    #[error("invalid judgment request: {0}")]
    InvalidRequest(String),

    /// The service is not configured or could not be reached.
    #[error("judgment service unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its time budget.
    #[error("judgment call timed out after {0}ms")]
    Timeout(u64),

    /// The service answered, but not with the expected payload.
    #[error("malformed judgment response: {0}")]
    MalformedResponse(String),
}

impl AgentError {
    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}
