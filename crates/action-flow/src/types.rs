//! Core types for step orchestration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use soulbrowser_core_types::{ExecutionId, ExecutionPath};

/// Per-path time budgets for executor calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTimeouts {
    pub snippet_ms: u64,
    pub reasoning_ms: u64,
}

impl Default for PathTimeouts {
    fn default() -> Self {
        Self {
            snippet_ms: 30_000,
            reasoning_ms: 120_000,
        }
    }
}

impl PathTimeouts {
    pub fn for_path(&self, path: ExecutionPath) -> Duration {
        match path {
            ExecutionPath::Snippet => Duration::from_millis(self.snippet_ms),
            ExecutionPath::Reasoning => Duration::from_millis(self.reasoning_ms),
        }
    }
}

/// Knobs for the recovery loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryOptions {
    /// Recovery rounds per failed step. Zero only analyses the failure.
    pub max_step_retries: u32,
    /// Time budget handed to solution-store lookups.
    pub solution_budget_ms: u64,
    /// Reported to the path decision as the CI signal.
    pub ci_environment: bool,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            max_step_retries: 0,
            solution_budget_ms: 5_000,
            ci_environment: false,
        }
    }
}

/// Result of one pass through the fallback wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub success: bool,
    pub path_used: ExecutionPath,
    pub fallback_occurred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "step failed without an error message".to_string())
    }
}

/// Identifies the step a wrapper call belongs to, for lifecycle events.
#[derive(Debug, Clone)]
pub struct StepScope {
    pub execution_id: ExecutionId,
    pub index: usize,
}

/// `recovered_by` marker for steps fixed by re-deciding the path.
pub const ADAPTIVE_PATH_MARKER: &str = "adaptive-path";
/// `recovered_by` marker for AI alternatives that could not be stored.
pub const AI_ALTERNATIVE_MARKER: &str = "ai-alternative";

/// Outcome of the recovery loop for one step.
#[derive(Debug, Clone)]
pub struct RecoveryResult {
    pub outcome: StepOutcome,
    /// Wrapper pass plus each recovery round that tried a remediation.
    pub attempts: u32,
    pub recovered_by: Option<String>,
    pub suggestion: Option<String>,
}
