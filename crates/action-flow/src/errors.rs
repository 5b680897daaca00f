//! Flow execution error types

use soulbrowser_core_types::SoulError;
use thiserror::Error;

/// Errors that stop a run before it starts.
///
/// Step failures are never errors; they end up in the report.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Intent spec validation failed
    #[error("Flow validation failed: {0}")]
    ValidationFailed(String),

    /// Orchestrator wiring is incomplete or contradictory
    #[error("Invalid orchestrator configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<SoulError> for FlowError {
    fn from(err: SoulError) -> Self {
        FlowError::ValidationFailed(err.to_string())
    }
}
