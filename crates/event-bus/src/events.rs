use serde::Serialize;

use soulbrowser_core_types::{ExecutionId, ExecutionPath};

/// Lifecycle notifications emitted while a run progresses.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutionEvent {
    #[serde(rename_all = "camelCase")]
    ExecutionStarted {
        execution_id: ExecutionId,
        spec_name: String,
        total_steps: usize,
    },
    #[serde(rename_all = "camelCase")]
    StepStarted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        preferred_path: ExecutionPath,
    },
    #[serde(rename_all = "camelCase")]
    FallbackStarted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        from: ExecutionPath,
        to: ExecutionPath,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    FallbackCompleted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        path: ExecutionPath,
        success: bool,
    },
    #[serde(rename_all = "camelCase")]
    StepCompleted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        path_used: ExecutionPath,
        success: bool,
        fallback_occurred: bool,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ExecutionCompleted {
        execution_id: ExecutionId,
        overall_success: bool,
        total_duration_ms: u64,
    },
}

impl ExecutionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::ExecutionStarted { .. } => "execution-started",
            ExecutionEvent::StepStarted { .. } => "step-started",
            ExecutionEvent::FallbackStarted { .. } => "fallback-started",
            ExecutionEvent::FallbackCompleted { .. } => "fallback-completed",
            ExecutionEvent::StepCompleted { .. } => "step-completed",
            ExecutionEvent::ExecutionCompleted { .. } => "execution-completed",
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            ExecutionEvent::ExecutionStarted { execution_id, .. }
            | ExecutionEvent::StepStarted { execution_id, .. }
            | ExecutionEvent::FallbackStarted { execution_id, .. }
            | ExecutionEvent::FallbackCompleted { execution_id, .. }
            | ExecutionEvent::StepCompleted { execution_id, .. }
            | ExecutionEvent::ExecutionCompleted { execution_id, .. } => execution_id,
        }
    }
}
