//! Rejection reasons shared by executor implementations

use thiserror::Error;

/// Why an executor refused or failed to run a step.
///
/// Executors fold these into [`crate::ExecOutcome::failure`]; the engine
/// treats every variant the same way, as a failed attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Snippet path invoked with empty code
    #[error("snippet code is empty")]
    EmptySnippet,

    /// Reasoning path invoked with an empty instruction
    #[error("instruction text is empty")]
    EmptyInstruction,

    /// No executor configured for the requested path
    #[error("no executor configured: {0}")]
    NotConfigured(String),

    /// Required credential missing for a remote service
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Remote service could not be reached
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The automation itself raised an error
    #[error("execution failed: {0}")]
    Execution(String),
}
