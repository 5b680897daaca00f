//! Recovery loop for failed steps
//!
//! Each round analyses the latest failure and tries, in order: the best
//! stored solution, the best AI-proposed alternative, and a re-run of the
//! wrapper on an adaptively chosen path.

use std::time::{Duration, Instant};

use action_primitives::PageContext;
use path_judge::{DecisionSignals, PathJudge};
use self_heal::{ErrorAnalysis, ErrorAnalyzer};
use solution_store::{ErrorContext, SharedSolutionStore, SolutionCandidate, Urgency};
use soulbrowser_core_types::{FallbackPath, Step, Variables};
use tracing::{debug, info, warn};

use crate::fallback::{elapsed_ms, FallbackExecutor};
use crate::types::{
    RecoveryOptions, RecoveryResult, StepOutcome, StepScope, ADAPTIVE_PATH_MARKER,
    AI_ALTERNATIVE_MARKER,
};

const AI_ALTERNATIVE_STRATEGY: &str = "ai_alternative";

#[derive(Clone)]
pub struct RecoveryEngine {
    analyzer: ErrorAnalyzer,
    judge: PathJudge,
    store: Option<SharedSolutionStore>,
    options: RecoveryOptions,
}

impl RecoveryEngine {
    pub fn new(analyzer: ErrorAnalyzer, judge: PathJudge) -> Self {
        Self {
            analyzer,
            judge,
            store: None,
            options: RecoveryOptions::default(),
        }
    }

    pub fn with_store(mut self, store: SharedSolutionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_options(mut self, options: RecoveryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RecoveryOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &ErrorAnalyzer {
        &self.analyzer
    }

    /// Classify and plan without asking for alternatives.
    pub async fn analyze_failure(&self, step: &Step, error: &str) -> ErrorAnalysis {
        self.analyzer.analyze(step, error, None, false).await
    }

    /// Try to turn `failed` into a success within the configured rounds.
    pub async fn recover(
        &self,
        wrapper: &FallbackExecutor,
        step: &Step,
        variables: &Variables,
        failed: StepOutcome,
        scope: Option<&StepScope>,
    ) -> RecoveryResult {
        let resolved = step.resolved(variables);
        let max_rounds = self.options.max_step_retries;
        if max_rounds == 0 {
            let analysis = self.analyze_failure(&resolved, &failed.error_message()).await;
            return RecoveryResult {
                outcome: failed,
                attempts: 1,
                recovered_by: None,
                suggestion: suggestion_for(&analysis),
            };
        }

        let started = Instant::now();
        let base_duration = failed.duration_ms;
        let mut current = failed;
        let mut suggestion = None;
        let mut rounds = 0;
        let mut attempts = 1;

        while rounds < max_rounds {
            rounds += 1;
            let error = current.error_message();
            let analysis = self
                .analyzer
                .analyze(&resolved, &error, Some(rounds - 1), true)
                .await;
            suggestion = suggestion_for(&analysis);
            if !analysis.is_recoverable {
                info!(
                    step = %step.name,
                    error_type = %analysis.error_type,
                    severity = %analysis.severity,
                    "failure is not recoverable; stopping recovery"
                );
                break;
            }
            attempts += 1;
            let context = error_context(&resolved, &analysis);
            let mut evolve_from = None;

            if let Some((outcome, solution_id)) = self
                .try_stored_solution(wrapper, variables, &context, &analysis, &current, &mut evolve_from)
                .await
            {
                return self.recovered(outcome, attempts, solution_id, base_duration, started);
            }

            if let Some((outcome, marker)) = self
                .try_alternative(
                    wrapper,
                    variables,
                    &context,
                    &analysis,
                    &current,
                    step,
                    evolve_from.as_deref(),
                )
                .await
            {
                return self.recovered(outcome, attempts, marker, base_duration, started);
            }

            let adaptive = self
                .try_adaptive_path(wrapper, step, variables, &analysis, rounds, scope)
                .await;
            let fallback_occurred = current.fallback_occurred || adaptive.fallback_occurred;
            current = StepOutcome {
                fallback_occurred,
                ..adaptive
            };
            if current.success {
                return self.recovered(
                    current,
                    attempts,
                    ADAPTIVE_PATH_MARKER.to_string(),
                    base_duration,
                    started,
                );
            }
            debug!(step = %step.name, round = rounds, "recovery round failed");
        }

        current.duration_ms = base_duration + elapsed_ms(started);
        RecoveryResult {
            outcome: current,
            attempts,
            recovered_by: None,
            suggestion,
        }
    }

    fn recovered(
        &self,
        mut outcome: StepOutcome,
        attempts: u32,
        recovered_by: String,
        base_duration: u64,
        started: Instant,
    ) -> RecoveryResult {
        outcome.duration_ms = base_duration + elapsed_ms(started);
        info!(recovered_by = %recovered_by, attempts, "step recovered");
        RecoveryResult {
            outcome,
            attempts,
            recovered_by: Some(recovered_by),
            suggestion: None,
        }
    }

    async fn try_stored_solution(
        &self,
        wrapper: &FallbackExecutor,
        variables: &Variables,
        context: &ErrorContext,
        analysis: &ErrorAnalysis,
        current: &StepOutcome,
        evolve_from: &mut Option<String>,
    ) -> Option<(StepOutcome, String)> {
        let store = self.store.as_ref()?;
        let lookup = store.find_solutions(
            context,
            Urgency::from(analysis.severity),
            Duration::from_millis(self.options.solution_budget_ms),
        );
        if lookup.fallback_required {
            debug!(step = %analysis.step_name, "no usable stored solution");
            return None;
        }
        let best = lookup.best()?;
        let started = Instant::now();
        let outcome = wrapper.run_snippet(&best.solution.code, variables).await;
        let duration = elapsed_ms(started);
        match store.record_outcome(&best.solution.id, outcome.success, duration) {
            Ok(report) if report.evolution_due => *evolve_from = Some(best.solution.id.clone()),
            Ok(_) => {}
            Err(err) => {
                warn!(solution = %best.solution.id, error = %err, "failed to record solution outcome");
            }
        }
        if !outcome.success {
            debug!(solution = %best.solution.id, error = %outcome.error_message(), "stored solution failed");
            return None;
        }
        Some((
            snippet_success(outcome.screenshots, current, duration),
            best.solution.id.clone(),
        ))
    }

    async fn try_alternative(
        &self,
        wrapper: &FallbackExecutor,
        variables: &Variables,
        context: &ErrorContext,
        analysis: &ErrorAnalysis,
        current: &StepOutcome,
        step: &Step,
        evolve_from: Option<&str>,
    ) -> Option<(StepOutcome, String)> {
        let alternative = analysis.best_alternative()?;
        let started = Instant::now();
        let outcome = wrapper.run_snippet(&alternative.code, variables).await;
        let duration = elapsed_ms(started);
        if !outcome.success {
            debug!(step = %step.name, error = %outcome.error_message(), "AI alternative failed");
            return None;
        }
        let marker = match self.store.as_ref() {
            Some(store) => {
                let candidate = SolutionCandidate::new(
                    alternative.code.clone(),
                    AI_ALTERNATIVE_STRATEGY,
                    alternative.confidence,
                )
                .with_tags(vec![step.name.clone()]);
                let stored = match evolve_from {
                    Some(parent) => store
                        .evolve_solution(parent, candidate.clone(), context)
                        .or_else(|err| {
                            debug!(parent, error = %err, "evolution skipped; storing a fresh solution");
                            store.store_new_solution(candidate, context)
                        }),
                    None => store.store_new_solution(candidate, context),
                };
                match stored {
                    Ok(solution) => {
                        if let Err(err) = store.record_outcome(&solution.id, true, duration) {
                            warn!(solution = %solution.id, error = %err, "failed to record solution outcome");
                        }
                        solution.id
                    }
                    Err(err) => {
                        warn!(step = %step.name, error = %err, "failed to store AI alternative");
                        AI_ALTERNATIVE_MARKER.to_string()
                    }
                }
            }
            None => AI_ALTERNATIVE_MARKER.to_string(),
        };
        Some((snippet_success(outcome.screenshots, current, duration), marker))
    }

    async fn try_adaptive_path(
        &self,
        wrapper: &FallbackExecutor,
        step: &Step,
        variables: &Variables,
        analysis: &ErrorAnalysis,
        round: u32,
        scope: Option<&StepScope>,
    ) -> StepOutcome {
        if step.fallback_path == FallbackPath::None {
            debug!(step = %step.name, path = %step.preferred_path, "no fallback path; re-running on the preferred path");
            return wrapper.execute_step_in(step, variables, scope).await;
        }
        let page = analysis
            .page_context
            .clone()
            .unwrap_or_else(PageContext::unknown);
        let signals = DecisionSignals::for_step(step, &page)
            .with_ci(self.options.ci_environment)
            .with_previous_step(false)
            .with_retry(round, self.options.max_step_retries);
        let decision = self
            .judge
            .decide(&signals, analysis.page_context.as_ref())
            .await;
        debug!(
            step = %step.name,
            choice = %decision.choice,
            confidence = decision.confidence,
            rationale = %decision.rationale,
            "adaptive path chosen"
        );
        let mut adaptive = step.clone();
        adaptive.preferred_path = decision.choice;
        adaptive.fallback_path = FallbackPath::from(decision.choice.other());
        wrapper.execute_step_in(&adaptive, variables, scope).await
    }
}

fn snippet_success(screenshots: Vec<String>, current: &StepOutcome, duration_ms: u64) -> StepOutcome {
    StepOutcome {
        success: true,
        path_used: soulbrowser_core_types::ExecutionPath::Snippet,
        fallback_occurred: current.fallback_occurred,
        error: None,
        screenshots,
        duration_ms,
    }
}

fn error_context(step: &Step, analysis: &ErrorAnalysis) -> ErrorContext {
    let mut context = ErrorContext::new(analysis.message.clone(), analysis.error_type).with_step(step.name.clone());
    if let Some(url) = analysis.page_context.as_ref().and_then(|page| page.url.clone()) {
        context = context.with_url(url);
    }
    context
}

/// One line for the report's suggestions.
pub fn suggestion_for(analysis: &ErrorAnalysis) -> Option<String> {
    if !analysis.is_recoverable {
        return Some(format!(
            "{}: {} {} error needs manual attention ({})",
            analysis.step_name, analysis.severity, analysis.error_type, analysis.root_cause
        ));
    }
    analysis.top_action().map(|action| {
        format!(
            "{}: {} (confidence {:.2})",
            analysis.step_name, action.description, action.confidence
        )
    })
}
