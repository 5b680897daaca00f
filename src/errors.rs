//! Errors raised while wiring or driving a replay session

use action_flow::FlowError;
use agent_core::AgentError;
use solution_store::SolutionStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Store(#[from] SolutionStoreError),

    #[error(transparent)]
    Judgment(#[from] AgentError),
}

impl ReplayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
