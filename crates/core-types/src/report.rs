//! Per-step and per-run execution reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExecutionId, ExecutionPath};

/// Index used for the synthetic result recorded when a run fails before its first step.
pub const INITIALIZATION_STEP_INDEX: i64 = -1;

/// Outcome of running one step. Built once per step per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecutionResult {
    pub index: i64,
    pub name: String,
    pub path_used: ExecutionPath,
    pub fallback_occurred: bool,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_by: Option<String>,
}

fn default_attempts() -> u32 {
    1
}

impl StepExecutionResult {
    /// Synthetic failed result for errors raised before the step loop starts.
    pub fn initialization_failure(path: ExecutionPath, error: impl Into<String>) -> Self {
        Self {
            index: INITIALIZATION_STEP_INDEX,
            name: "initialization".to_string(),
            path_used: path,
            fallback_occurred: false,
            success: false,
            duration_ms: 0,
            error: Some(error.into()),
            attempts: 1,
            recovered_by: None,
        }
    }
}

/// Aggregate over a full run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution_id: ExecutionId,
    pub spec_name: String,
    pub steps: Vec<StepExecutionResult>,
    pub ai_usage_count: u32,
    pub snippet_usage_count: u32,
    pub fallback_count: u32,
    pub overall_success: bool,
    pub total_duration_ms: u64,
    pub screenshots: Vec<String>,
    pub suggestions: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn new(execution_id: ExecutionId, spec_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            execution_id,
            spec_name: spec_name.into(),
            steps: Vec::new(),
            ai_usage_count: 0,
            snippet_usage_count: 0,
            fallback_count: 0,
            overall_success: true,
            total_duration_ms: 0,
            screenshots: Vec::new(),
            suggestions: Vec::new(),
            started_at: now,
            finished_at: now,
            cancelled: false,
        }
    }

    /// Append a step result and fold it into the counters.
    ///
    /// Usage counters follow the path that finally ran, not the preferred one.
    pub fn record_step(&mut self, result: StepExecutionResult, continue_on_failure: bool) {
        match result.path_used {
            ExecutionPath::Reasoning => self.ai_usage_count += 1,
            ExecutionPath::Snippet => self.snippet_usage_count += 1,
        }
        if result.fallback_occurred {
            self.fallback_count += 1;
        }
        if !result.success && !continue_on_failure {
            self.overall_success = false;
        }
        self.steps.push(result);
    }

    /// Record a failure that happened before any step ran.
    pub fn record_initialization_failure(&mut self, result: StepExecutionResult) {
        self.overall_success = false;
        self.steps.push(result);
    }

    pub fn push_suggestion(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
        self.overall_success = false;
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepExecutionResult> {
        self.steps.iter().filter(|step| !step.success)
    }

    /// Set the finish time and total duration.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
        self.total_duration_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
    }
}
