mod common;

use std::sync::Arc;

use action_flow::{ExecutionOrchestrator, RecoveryEngine, RecoveryOptions, ADAPTIVE_PATH_MARKER};
use agent_core::StaticJudgmentProvider;
use common::ScriptedExecutor;
use path_judge::PathJudge;
use self_heal::{ErrorAnalyzer, ErrorHistory, ErrorType, RecoveryPlanner};
use solution_store::{ErrorContext, SolutionCandidate, SolutionStore};
use soulbrowser_core_types::{ExecutionPath, FallbackPath, IntentSpec, Step, Variables};

fn engine(planner: RecoveryPlanner, retries: u32) -> RecoveryEngine {
    RecoveryEngine::new(
        ErrorAnalyzer::new(planner, Arc::new(ErrorHistory::default())),
        PathJudge::rule_based(),
    )
    .with_options(RecoveryOptions {
        max_step_retries: retries,
        ..RecoveryOptions::default()
    })
}

fn buy_spec() -> IntentSpec {
    IntentSpec::new(
        "checkout",
        vec![Step::new("buy", ExecutionPath::Snippet)
            .with_snippet("click('#buy')")
            .with_instruction("Buy it")],
    )
}

#[tokio::test]
async fn stored_solution_recovers_and_is_scored() {
    let store = Arc::new(SolutionStore::default());
    let solution = store
        .store_new_solution(
            SolutionCandidate::new("click('[data-testid=buy]')", "alternate_selector", 0.9),
            &ErrorContext::new("Element not found: '#buy'", ErrorType::Selector),
        )
        .unwrap();
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .succeeds("click('[data-testid=buy]')")
        .shared();
    let reasoning = ScriptedExecutor::new().shared();
    let orchestrator = ExecutionOrchestrator::builder(snippet, reasoning.clone())
        .recovery(engine(RecoveryPlanner::default(), 2).with_store(store.clone()))
        .build();

    let report = orchestrator.run(&buy_spec(), &Variables::new()).await.unwrap();
    let step = &report.steps[0];
    assert!(report.overall_success);
    assert_eq!(step.recovered_by.as_deref(), Some(solution.id.as_str()));
    assert_eq!(step.attempts, 2);
    assert_eq!(step.path_used, ExecutionPath::Snippet);
    assert_eq!(reasoning.calls(), 0);

    let scored = store.get(&solution.id).unwrap();
    assert_eq!(scored.usage_statistics.total_uses, 1);
    assert_eq!(scored.usage_statistics.success_count, 1);
}

#[tokio::test]
async fn successful_ai_alternative_becomes_a_solution() {
    let reply = r#"{"alternatives":[{"code":"click('text=Buy')","explanation":"text selector"}]}"#;
    let planner = RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new(reply))));
    let store = Arc::new(SolutionStore::default());
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .succeeds("click('text=Buy')")
        .shared();
    let orchestrator = ExecutionOrchestrator::builder(snippet, ScriptedExecutor::new().shared())
        .recovery(engine(planner, 1).with_store(store.clone()))
        .build();

    let report = orchestrator.run(&buy_spec(), &Variables::new()).await.unwrap();
    assert!(report.overall_success);
    assert_eq!(store.len(), 1);
    let stored = store.list().remove(0);
    assert_eq!(stored.code, "click('text=Buy')");
    assert_eq!(stored.strategy, "ai_alternative");
    assert!((stored.confidence - 0.9).abs() < 1e-9);
    assert_eq!(stored.usage_statistics.success_count, 1);
    assert_eq!(report.steps[0].recovered_by.as_deref(), Some(stored.id.as_str()));
}

#[tokio::test]
async fn adaptive_path_reruns_the_step() {
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .shared();
    let reasoning = ScriptedExecutor::new()
        .fails_first("Buy it", "agent could not find the button", 1)
        .shared();
    let spec = IntentSpec::new(
        "checkout",
        vec![Step::new("buy", ExecutionPath::Snippet)
            .with_snippet("click('#buy')")
            .with_instruction("Buy it")
            .with_fallback(FallbackPath::Reasoning)],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet, reasoning.clone())
        .recovery(engine(RecoveryPlanner::default(), 1))
        .build();

    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();
    let step = &report.steps[0];
    assert!(report.overall_success);
    assert_eq!(step.recovered_by.as_deref(), Some(ADAPTIVE_PATH_MARKER));
    assert_eq!(step.path_used, ExecutionPath::Reasoning);
    assert!(step.fallback_occurred);
    assert_eq!(report.ai_usage_count, 1);
    assert_eq!(reasoning.calls(), 2);
}

#[tokio::test]
async fn step_without_fallback_is_retried_on_its_own_path() {
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .shared();
    let reasoning = ScriptedExecutor::new().succeeds("Buy it").shared();
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), reasoning.clone())
        .recovery(engine(RecoveryPlanner::default(), 1))
        .build();

    let report = orchestrator.run(&buy_spec(), &Variables::new()).await.unwrap();
    let step = &report.steps[0];
    assert!(!report.overall_success);
    assert_eq!(step.path_used, ExecutionPath::Snippet);
    assert!(!step.fallback_occurred);
    assert_eq!(step.attempts, 2);
    assert!(step.recovered_by.is_none());
    assert_eq!(report.fallback_count, 0);
    assert_eq!(report.ai_usage_count, 0);
    assert_eq!(snippet.calls(), 2);
    assert_eq!(reasoning.calls(), 0);
}

#[tokio::test]
async fn failing_solution_evolves_into_working_alternative() {
    let store = Arc::new(SolutionStore::default());
    let parent = store
        .store_new_solution(
            SolutionCandidate::new("click('[data-testid=buy]')", "alternate_selector", 0.9),
            &ErrorContext::new("Element not found: '#buy'", ErrorType::Selector),
        )
        .unwrap();
    store.record_outcome(&parent.id, false, 10).unwrap();
    store.record_outcome(&parent.id, false, 10).unwrap();

    let reply = r#"{"alternatives":[{"code":"click('text=Buy')","explanation":"text selector"}]}"#;
    let planner = RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new(reply))));
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .fails("click('[data-testid=buy]')", "Element not found: '#buy'")
        .succeeds("click('text=Buy')")
        .shared();
    let orchestrator = ExecutionOrchestrator::builder(snippet, ScriptedExecutor::new().shared())
        .recovery(engine(planner, 1).with_store(store.clone()))
        .build();

    let report = orchestrator.run(&buy_spec(), &Variables::new()).await.unwrap();
    assert!(report.overall_success);
    assert_eq!(store.len(), 2);

    let parent = store.get(&parent.id).unwrap();
    let child_id = parent.evolved_into.clone().expect("parent linked to successor");
    let child = store.get(&child_id).unwrap();
    assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
    assert_eq!(child.code, "click('text=Buy')");
    assert_eq!(child.generation, 1);
    assert_eq!(child.usage_statistics.success_count, 1);
    assert_eq!(parent.usage_statistics.failure_count, 3);
    assert_eq!(report.steps[0].recovered_by.as_deref(), Some(child_id.as_str()));
}

#[tokio::test]
async fn unrecoverable_failures_are_not_retried() {
    let snippet = ScriptedExecutor::new()
        .fails("login()", "element not found: #password")
        .shared();
    let reasoning = ScriptedExecutor::new().succeeds("Log in").shared();
    let spec = IntentSpec::new(
        "auth",
        vec![Step::new("Login", ExecutionPath::Snippet)
            .with_snippet("login()")
            .with_instruction("Log in")],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), reasoning.clone())
        .recovery(engine(RecoveryPlanner::default(), 3))
        .build();

    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();
    assert!(!report.overall_success);
    assert_eq!(report.steps[0].attempts, 1);
    assert_eq!(snippet.calls(), 1);
    assert_eq!(reasoning.calls(), 0);
    assert!(report.suggestions[0].contains("needs manual attention"));
}

#[tokio::test]
async fn zero_retries_still_suggest_actions() {
    let snippet = ScriptedExecutor::new()
        .fails("click('#buy')", "Element not found: '#buy'")
        .shared();
    let reasoning = ScriptedExecutor::new().shared();
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), reasoning.clone())
        .recovery(engine(RecoveryPlanner::default(), 0))
        .build();

    let report = orchestrator.run(&buy_spec(), &Variables::new()).await.unwrap();
    assert!(!report.overall_success);
    assert_eq!(report.steps[0].attempts, 1);
    assert_eq!(snippet.calls(), 1);
    assert_eq!(reasoning.calls(), 0);
    assert_eq!(
        report.suggestions,
        vec!["buy: run the step on the reasoning path instead (target element could not be located with the recorded selector) (confidence 0.85)".to_string()]
    );
}
