//! Fallback wrapper
//!
//! Runs a step on its preferred path and, when that fails and the step
//! names a fallback, on the fallback path. Executor failures, empty inputs
//! and timeouts all come back as a failed [`StepOutcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use action_primitives::{ExecOutcome, ReasoningExecutor, SnippetExecutor};
use soulbrowser_core_types::{ExecutionPath, Step, Variables};
use soulbrowser_event_bus::{emit, ExecutionBus, ExecutionEvent};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::types::{PathTimeouts, StepOutcome, StepScope};

#[derive(Clone)]
pub struct FallbackExecutor {
    snippet: Arc<dyn SnippetExecutor>,
    reasoning: Arc<dyn ReasoningExecutor>,
    timeouts: PathTimeouts,
    bus: Option<Arc<ExecutionBus>>,
}

impl FallbackExecutor {
    pub fn new(snippet: Arc<dyn SnippetExecutor>, reasoning: Arc<dyn ReasoningExecutor>) -> Self {
        Self {
            snippet,
            reasoning,
            timeouts: PathTimeouts::default(),
            bus: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: PathTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_bus(mut self, bus: Arc<ExecutionBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn timeouts(&self) -> PathTimeouts {
        self.timeouts
    }

    /// Run `step` without lifecycle events.
    pub async fn execute_step(&self, step: &Step, variables: &Variables) -> StepOutcome {
        self.execute_step_in(step, variables, None).await
    }

    /// Run `step`, emitting fallback events for `scope` when a bus is attached.
    pub async fn execute_step_in(
        &self,
        step: &Step,
        variables: &Variables,
        scope: Option<&StepScope>,
    ) -> StepOutcome {
        let started = Instant::now();
        let primary = step.preferred_path;
        let first = self.attempt(primary, step, variables).await;
        if first.success {
            return finish(primary, false, first, Vec::new(), started);
        }
        let primary_error = first.error_message();

        let Some(fallback) = step.fallback() else {
            debug!(step = %step.name, path = %primary, error = %primary_error, "step failed without fallback");
            return finish(primary, false, first, Vec::new(), started);
        };

        info!(
            step = %step.name,
            from = %primary,
            to = %fallback,
            error = %primary_error,
            "primary path failed; trying fallback"
        );
        if let Some(scope) = scope {
            emit(
                self.bus.as_ref(),
                ExecutionEvent::FallbackStarted {
                    execution_id: scope.execution_id.clone(),
                    index: scope.index,
                    name: step.name.clone(),
                    from: primary,
                    to: fallback,
                    reason: primary_error.clone(),
                },
            )
            .await;
        }

        let second = self.attempt(fallback, step, variables).await;
        if let Some(scope) = scope {
            emit(
                self.bus.as_ref(),
                ExecutionEvent::FallbackCompleted {
                    execution_id: scope.execution_id.clone(),
                    index: scope.index,
                    name: step.name.clone(),
                    path: fallback,
                    success: second.success,
                },
            )
            .await;
        }

        let mut screenshots = first.screenshots;
        if second.success {
            return finish(fallback, true, second, screenshots, started);
        }
        let combined = format!(
            "{primary} path failed: {primary_error}; {fallback} path failed: {}",
            second.error_message()
        );
        warn!(step = %step.name, error = %combined, "both paths failed");
        screenshots.extend(second.screenshots);
        StepOutcome {
            success: false,
            path_used: fallback,
            fallback_occurred: true,
            error: Some(combined),
            screenshots,
            duration_ms: elapsed_ms(started),
        }
    }

    /// Run one path for `step`, substituting variables first.
    pub async fn attempt(
        &self,
        path: ExecutionPath,
        step: &Step,
        variables: &Variables,
    ) -> ExecOutcome {
        let resolved = step.resolved(variables);
        match path {
            ExecutionPath::Snippet => self.run_snippet(&resolved.snippet_code, variables).await,
            ExecutionPath::Reasoning => {
                let budget = self.timeouts.for_path(ExecutionPath::Reasoning);
                let call = self.reasoning.execute(&resolved.instruction_text, variables);
                bounded(path, budget, call).await
            }
        }
    }

    /// Run arbitrary code on the snippet executor under the snippet budget.
    pub async fn run_snippet(&self, code: &str, variables: &Variables) -> ExecOutcome {
        let budget = self.timeouts.for_path(ExecutionPath::Snippet);
        bounded(ExecutionPath::Snippet, budget, self.snippet.execute(code, variables)).await
    }
}

async fn bounded<F>(path: ExecutionPath, budget: Duration, call: F) -> ExecOutcome
where
    F: std::future::Future<Output = ExecOutcome>,
{
    match timeout(budget, call).await {
        Ok(outcome) => outcome,
        Err(_) => ExecOutcome::failure(format!(
            "{path} path timed out after {}ms",
            budget.as_millis()
        )),
    }
}

fn finish(
    path: ExecutionPath,
    fallback_occurred: bool,
    outcome: ExecOutcome,
    mut screenshots: Vec<String>,
    started: Instant,
) -> StepOutcome {
    let error = (!outcome.success).then(|| outcome.error_message());
    screenshots.extend(outcome.screenshots);
    StepOutcome {
        success: outcome.success,
        path_used: path,
        fallback_occurred,
        error,
        screenshots,
        duration_ms: elapsed_ms(started),
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use soulbrowser_core_types::FallbackPath;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        succeed: bool,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Scripted {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                succeed: true,
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        async fn run(&self, label: &str, input: &str) -> ExecOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if input.trim().is_empty() {
                return ExecOutcome::failure(format!("{label} input is empty"));
            }
            if self.succeed {
                ExecOutcome::success()
            } else {
                ExecOutcome::failure(format!("{label} failed on {input}"))
            }
        }
    }

    #[async_trait]
    impl SnippetExecutor for Scripted {
        async fn execute(&self, code: &str, _variables: &Variables) -> ExecOutcome {
            self.run("snippet", code).await
        }
    }

    #[async_trait]
    impl ReasoningExecutor for Scripted {
        async fn execute(&self, instruction: &str, _variables: &Variables) -> ExecOutcome {
            self.run("reasoning", instruction).await
        }
    }

    fn step(preferred: ExecutionPath, fallback: FallbackPath) -> Step {
        Step::new("submit", preferred)
            .with_snippet("click('#submit')")
            .with_instruction("Press the submit button")
            .with_fallback(fallback)
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let snippet = Scripted::new(true);
        let reasoning = Scripted::new(true);
        let wrapper = FallbackExecutor::new(snippet.clone(), reasoning.clone());
        let outcome = wrapper
            .execute_step(&step(ExecutionPath::Snippet, FallbackPath::Reasoning), &Variables::new())
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.path_used, ExecutionPath::Snippet);
        assert!(!outcome.fallback_occurred);
        assert_eq!(reasoning.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn both_failures_are_concatenated() {
        let wrapper = FallbackExecutor::new(Scripted::new(false), Scripted::new(false));
        let outcome = wrapper
            .execute_step(&step(ExecutionPath::Reasoning, FallbackPath::Snippet), &Variables::new())
            .await;
        assert!(!outcome.success);
        assert!(outcome.fallback_occurred);
        assert_eq!(outcome.path_used, ExecutionPath::Snippet);
        let error = outcome.error.unwrap();
        assert!(error.starts_with("reasoning path failed: reasoning failed"));
        assert!(error.contains("; snippet path failed: snippet failed"));
    }

    #[tokio::test]
    async fn empty_snippet_is_a_failure() {
        let wrapper = FallbackExecutor::new(Scripted::new(true), Scripted::new(true));
        let bare = Step::new("noop", ExecutionPath::Snippet);
        let outcome = wrapper.execute_step(&bare, &Variables::new()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("snippet input is empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let wrapper = FallbackExecutor::new(Scripted::slow(Duration::from_secs(5)), Scripted::new(true))
            .with_timeouts(PathTimeouts {
                snippet_ms: 100,
                reasoning_ms: 1_000,
            });
        let outcome = wrapper
            .execute_step(&step(ExecutionPath::Snippet, FallbackPath::None), &Variables::new())
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("snippet path timed out after 100ms"));
    }
}
