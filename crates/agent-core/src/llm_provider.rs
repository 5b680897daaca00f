use async_trait::async_trait;

use crate::errors::AgentError;
use crate::model::JudgmentRequest;

/// Abstraction over remote reasoning services so multiple vendors can plug in.
#[async_trait]
pub trait JudgmentProvider: Send + Sync {
    /// Send the prompt and return the raw textual answer.
    async fn complete(&self, request: &JudgmentRequest) -> Result<String, AgentError>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "judgment"
    }
}

/// Provider used when no service is configured. Every call fails, which
/// drives callers onto their deterministic fallbacks.
#[derive(Debug, Default, Clone)]
pub struct OfflineJudgmentProvider;

#[async_trait]
impl JudgmentProvider for OfflineJudgmentProvider {
    async fn complete(&self, _request: &JudgmentRequest) -> Result<String, AgentError> {
        Err(AgentError::unavailable("no judgment service configured"))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

/// Deterministic provider used for tests and offline development.
#[derive(Debug, Clone)]
pub struct StaticJudgmentProvider {
    reply: String,
}

impl StaticJudgmentProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl JudgmentProvider for StaticJudgmentProvider {
    async fn complete(&self, request: &JudgmentRequest) -> Result<String, AgentError> {
        if request.turns.is_empty() {
            return Err(AgentError::invalid_request("judgment request has no turns"));
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
