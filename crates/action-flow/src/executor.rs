//! Step orchestrator

use std::sync::Arc;

use action_primitives::{DetachedPageInspector, PageInspector, ReasoningExecutor, SnippetExecutor};
use soulbrowser_core_types::{
    ExecutionId, ExecutionReport, IntentSpec, Step, StepExecutionResult, Variables,
};
use soulbrowser_event_bus::{emit, ExecutionBus, ExecutionEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::fallback::FallbackExecutor;
use crate::recovery::RecoveryEngine;
use crate::types::{PathTimeouts, StepScope};

/// Walks an intent spec step by step.
///
/// One orchestrator runs one spec at a time; steps never overlap.
pub struct ExecutionOrchestrator {
    wrapper: FallbackExecutor,
    inspector: Arc<dyn PageInspector>,
    bus: Option<Arc<ExecutionBus>>,
    recovery: Option<RecoveryEngine>,
    cancel: CancellationToken,
}

pub struct OrchestratorBuilder {
    snippet: Arc<dyn SnippetExecutor>,
    reasoning: Arc<dyn ReasoningExecutor>,
    inspector: Arc<dyn PageInspector>,
    timeouts: PathTimeouts,
    bus: Option<Arc<ExecutionBus>>,
    recovery: Option<RecoveryEngine>,
    cancel: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    pub fn inspector(mut self, inspector: Arc<dyn PageInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn timeouts(mut self, timeouts: PathTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn bus(mut self, bus: Arc<ExecutionBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn recovery(mut self, engine: RecoveryEngine) -> Self {
        self.recovery = Some(engine);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> ExecutionOrchestrator {
        let mut wrapper = FallbackExecutor::new(self.snippet, self.reasoning).with_timeouts(self.timeouts);
        if let Some(bus) = self.bus.clone() {
            wrapper = wrapper.with_bus(bus);
        }
        ExecutionOrchestrator {
            wrapper,
            inspector: self.inspector,
            bus: self.bus,
            recovery: self.recovery,
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

impl ExecutionOrchestrator {
    pub fn builder(
        snippet: Arc<dyn SnippetExecutor>,
        reasoning: Arc<dyn ReasoningExecutor>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            snippet,
            reasoning,
            inspector: Arc::new(DetachedPageInspector),
            timeouts: PathTimeouts::default(),
            bus: None,
            recovery: None,
            cancel: None,
        }
    }

    pub fn wrapper(&self) -> &FallbackExecutor {
        &self.wrapper
    }

    /// Token checked between steps.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `spec` to completion, halt or cancellation.
    ///
    /// Returns `Err` only for an invalid spec; everything that goes wrong
    /// while running ends up in the report.
    pub async fn run(
        &self,
        spec: &IntentSpec,
        variables: &Variables,
    ) -> Result<ExecutionReport, FlowError> {
        spec.validate()?;
        let execution_id = ExecutionId::new();
        let mut report = ExecutionReport::new(execution_id.clone(), spec.name.clone());
        info!(
            execution_id = %execution_id,
            spec = %spec.name,
            steps = spec.steps.len(),
            "execution started"
        );
        emit(
            self.bus.as_ref(),
            ExecutionEvent::ExecutionStarted {
                execution_id: execution_id.clone(),
                spec_name: spec.name.clone(),
                total_steps: spec.steps.len(),
            },
        )
        .await;

        if let Err(err) = self.inspector.attach(&spec.start_url).await {
            warn!(execution_id = %execution_id, error = %err, "initialization failed");
            let path = spec
                .steps
                .first()
                .map(|step| step.preferred_path)
                .unwrap_or(soulbrowser_core_types::ExecutionPath::Snippet);
            report.record_initialization_failure(StepExecutionResult::initialization_failure(
                path,
                err.to_string(),
            ));
            return Ok(self.complete(report).await);
        }

        for (index, step) in spec.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    execution_id = %execution_id,
                    remaining = spec.steps.len() - index,
                    "execution cancelled between steps"
                );
                report.mark_cancelled();
                break;
            }
            let result = self.run_step(&execution_id, index, step, variables, &mut report).await;
            let halt = !result.success && !step.continue_on_failure;
            report.record_step(result, step.continue_on_failure);
            if halt {
                warn!(execution_id = %execution_id, step = %step.name, "step failed; halting run");
                break;
            }
        }

        if !spec.validations.is_empty() && !report.cancelled {
            self.run_validations(&execution_id, &spec.validations, variables).await;
        }

        let fallback_steps: Vec<&str> = report
            .steps
            .iter()
            .filter(|result| result.fallback_occurred)
            .map(|result| result.name.as_str())
            .collect();
        if !fallback_steps.is_empty() {
            let hint = format!(
                "revisit the preferred path of: {}",
                fallback_steps.join(", ")
            );
            report.push_suggestion(hint);
        }

        Ok(self.complete(report).await)
    }

    async fn run_step(
        &self,
        execution_id: &ExecutionId,
        index: usize,
        step: &Step,
        variables: &Variables,
        report: &mut ExecutionReport,
    ) -> StepExecutionResult {
        debug!(execution_id = %execution_id, index, step = %step.name, path = %step.preferred_path, "step started");
        emit(
            self.bus.as_ref(),
            ExecutionEvent::StepStarted {
                execution_id: execution_id.clone(),
                index,
                name: step.name.clone(),
                preferred_path: step.preferred_path,
            },
        )
        .await;

        let scope = StepScope {
            execution_id: execution_id.clone(),
            index,
        };
        let outcome = self.wrapper.execute_step_in(step, variables, Some(&scope)).await;

        let (outcome, attempts, recovered_by) = match (&self.recovery, outcome.success) {
            (Some(engine), false) => {
                let recovery = engine
                    .recover(&self.wrapper, step, variables, outcome, Some(&scope))
                    .await;
                if let Some(suggestion) = recovery.suggestion {
                    report.push_suggestion(suggestion);
                }
                (recovery.outcome, recovery.attempts, recovery.recovered_by)
            }
            (_, _) => (outcome, 1, None),
        };

        report.screenshots.extend(outcome.screenshots.iter().cloned());
        emit(
            self.bus.as_ref(),
            ExecutionEvent::StepCompleted {
                execution_id: execution_id.clone(),
                index,
                name: step.name.clone(),
                path_used: outcome.path_used,
                success: outcome.success,
                fallback_occurred: outcome.fallback_occurred,
                duration_ms: outcome.duration_ms,
            },
        )
        .await;
        info!(
            execution_id = %execution_id,
            index,
            step = %step.name,
            path = %outcome.path_used,
            success = outcome.success,
            fallback = outcome.fallback_occurred,
            "step completed"
        );

        StepExecutionResult {
            index: index as i64,
            name: step.name.clone(),
            path_used: outcome.path_used,
            fallback_occurred: outcome.fallback_occurred,
            success: outcome.success,
            duration_ms: outcome.duration_ms,
            error: outcome.error,
            attempts,
            recovered_by,
        }
    }

    /// Informational only; results stay out of the report.
    async fn run_validations(&self, execution_id: &ExecutionId, validations: &[Step], variables: &Variables) {
        for validation in validations {
            let outcome = self.wrapper.execute_step(validation, variables).await;
            if outcome.success {
                info!(execution_id = %execution_id, validation = %validation.name, path = %outcome.path_used, "validation passed");
            } else {
                warn!(
                    execution_id = %execution_id,
                    validation = %validation.name,
                    error = %outcome.error_message(),
                    "validation failed"
                );
            }
        }
    }

    async fn complete(&self, mut report: ExecutionReport) -> ExecutionReport {
        report.finish();
        info!(
            execution_id = %report.execution_id,
            success = report.overall_success,
            ai = report.ai_usage_count,
            snippet = report.snippet_usage_count,
            fallbacks = report.fallback_count,
            duration_ms = report.total_duration_ms,
            "execution completed"
        );
        emit(
            self.bus.as_ref(),
            ExecutionEvent::ExecutionCompleted {
                execution_id: report.execution_id.clone(),
                overall_success: report.overall_success,
                total_duration_ms: report.total_duration_ms,
            },
        )
        .await;
        report
    }
}
