//! Collaborator traits

use async_trait::async_trait;
use soulbrowser_core_types::Variables;

use crate::errors::ExecutorError;
use crate::types::{ExecOutcome, PageContext};

/// Runs deterministic, pre-authored automation code.
#[async_trait]
pub trait SnippetExecutor: Send + Sync {
    /// Execute `code`. Implementations must reject empty code.
    async fn execute(&self, code: &str, variables: &Variables) -> ExecOutcome;
}

/// Lets a reasoning agent carry out a natural-language instruction.
#[async_trait]
pub trait ReasoningExecutor: Send + Sync {
    /// Execute `instruction`. Implementations must reject an empty
    /// instruction and an unreachable or misconfigured service.
    async fn execute(&self, instruction: &str, variables: &Variables) -> ExecOutcome;
}

/// Read-only view of the live page.
#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Prepare the browser before the first step. The default does nothing.
    async fn attach(&self, _start_url: &str) -> Result<(), ExecutorError> {
        Ok(())
    }

    /// Current page state. Never fails; unknown fields stay empty.
    async fn inspect(&self) -> PageContext;
}

/// Inspector used when no browser is attached.
#[derive(Debug, Default, Clone)]
pub struct DetachedPageInspector;

#[async_trait]
impl PageInspector for DetachedPageInspector {
    async fn inspect(&self) -> PageContext {
        PageContext::unknown()
    }
}

/// Executor standing in for a path that has not been wired up.
///
/// Every call fails, so steps depending on it fall through to their
/// fallback path.
#[derive(Debug, Clone)]
pub struct UnconfiguredExecutor {
    label: &'static str,
}

impl UnconfiguredExecutor {
    pub fn snippet() -> Self {
        Self { label: "snippet" }
    }

    pub fn reasoning() -> Self {
        Self { label: "reasoning" }
    }
}

#[async_trait]
impl SnippetExecutor for UnconfiguredExecutor {
    async fn execute(&self, _code: &str, _variables: &Variables) -> ExecOutcome {
        ExecutorError::NotConfigured(self.label.to_string()).into()
    }
}

#[async_trait]
impl ReasoningExecutor for UnconfiguredExecutor {
    async fn execute(&self, _instruction: &str, _variables: &Variables) -> ExecOutcome {
        ExecutorError::NotConfigured(self.label.to_string()).into()
    }
}
