mod common;

use std::sync::Arc;

use action_flow::{ExecutionOrchestrator, FlowError};
use action_primitives::{ExecutorError, PageContext, PageInspector};
use async_trait::async_trait;
use common::ScriptedExecutor;
use soulbrowser_core_types::{ExecutionPath, FallbackPath, IntentSpec, Step, Variables};
use soulbrowser_event_bus::{EventBus, ExecutionBus, ExecutionEvent, InMemoryBus};
use tokio_util::sync::CancellationToken;

fn snippet_step(name: &str, code: &str) -> Step {
    Step::new(name, ExecutionPath::Snippet).with_snippet(code)
}

#[tokio::test]
async fn usage_counters_follow_final_path() {
    let reasoning = ScriptedExecutor::new()
        .succeeds("do A")
        .fails("do C", "element not found: #c")
        .shared();
    let snippet = ScriptedExecutor::new().succeeds("b()").succeeds("c()").shared();
    let spec = IntentSpec::new(
        "three-steps",
        vec![
            Step::new("A", ExecutionPath::Reasoning)
                .with_instruction("do A")
                .with_snippet("a()")
                .with_fallback(FallbackPath::Snippet),
            Step::new("B", ExecutionPath::Snippet)
                .with_snippet("b()")
                .with_instruction("do B")
                .with_fallback(FallbackPath::Reasoning),
            Step::new("C", ExecutionPath::Reasoning)
                .with_instruction("do C")
                .with_snippet("c()")
                .with_fallback(FallbackPath::Snippet),
        ],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), reasoning.clone()).build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.ai_usage_count, 1);
    assert_eq!(report.snippet_usage_count, 2);
    assert_eq!(report.fallback_count, 1);
    assert!(report.overall_success);
    assert_eq!(report.steps[2].path_used, ExecutionPath::Snippet);
    assert!(report.steps[2].fallback_occurred);
    assert_eq!(snippet.inputs(), vec!["b()", "c()"]);
    assert!(report
        .suggestions
        .iter()
        .any(|s| s == "revisit the preferred path of: C"));
}

#[tokio::test]
async fn halting_failure_stops_the_loop() {
    let snippet = ScriptedExecutor::new()
        .succeeds("one()")
        .fails("two()", "element not found")
        .succeeds("three()")
        .shared();
    let spec = IntentSpec::new(
        "halts",
        vec![
            snippet_step("one", "one()"),
            snippet_step("two", "two()"),
            snippet_step("three", "three()"),
        ],
    );
    let orchestrator =
        ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared()).build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.steps.len(), 2);
    assert!(!report.overall_success);
    assert_eq!(report.steps[1].error.as_deref(), Some("element not found"));
    assert_eq!(snippet.calls(), 2);
}

#[tokio::test]
async fn no_fallback_never_touches_other_executor() {
    let snippet = ScriptedExecutor::new().fails("go()", "net::ERR_FAILED").shared();
    let reasoning = ScriptedExecutor::new().succeeds("go").shared();
    let spec = IntentSpec::new(
        "no-fallback",
        vec![snippet_step("go", "go()").with_instruction("go")],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet, reasoning.clone()).build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.fallback_count, 0);
    assert!(!report.overall_success);
    assert!(!report.steps[0].fallback_occurred);
    assert_eq!(report.steps[0].path_used, ExecutionPath::Snippet);
    assert_eq!(reasoning.calls(), 0);
}

#[tokio::test]
async fn optional_failures_do_not_halt() {
    let snippet = ScriptedExecutor::new()
        .fails("banner()", "element not found")
        .succeeds("next()")
        .shared();
    let spec = IntentSpec::new(
        "optional",
        vec![
            snippet_step("dismiss banner", "banner()").continue_on_failure(true),
            snippet_step("next", "next()"),
        ],
    );
    let orchestrator =
        ExecutionOrchestrator::builder(snippet, ScriptedExecutor::new().shared()).build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.steps.len(), 2);
    assert!(!report.steps[0].success);
    assert!(report.overall_success);
}

#[tokio::test]
async fn variables_are_substituted_per_attempt() {
    let snippet = ScriptedExecutor::new()
        .succeeds("fill('ada@example.com', '{{MISSING}}')")
        .shared();
    let spec = IntentSpec::new(
        "vars",
        vec![snippet_step("fill", "fill('{{EMAIL}}', '{{MISSING}}')")],
    );
    let variables: Variables = [("EMAIL".to_string(), "ada@example.com".to_string())]
        .into_iter()
        .collect();
    let orchestrator =
        ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared()).build();
    let report = orchestrator.run(&spec, &variables).await.unwrap();
    assert!(report.overall_success);
    assert_eq!(snippet.inputs(), vec!["fill('ada@example.com', '{{MISSING}}')"]);
}

#[tokio::test]
async fn lifecycle_events_arrive_in_order() {
    let bus = InMemoryBus::<ExecutionEvent>::new(32);
    let mut rx = bus.subscribe();
    let reasoning = ScriptedExecutor::new().fails("search", "timed out").shared();
    let snippet = ScriptedExecutor::new().succeeds("search()").shared();
    let spec = IntentSpec::new(
        "events",
        vec![Step::new("search", ExecutionPath::Reasoning)
            .with_instruction("search")
            .with_snippet("search()")
            .with_fallback(FallbackPath::Snippet)],
    );
    let shared_bus: Arc<ExecutionBus> = bus.clone();
    let orchestrator = ExecutionOrchestrator::builder(snippet, reasoning)
        .bus(shared_bus)
        .build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.execution_id(), &report.execution_id);
        if let ExecutionEvent::StepCompleted { path_used, success, .. } = &event {
            assert_eq!(*path_used, ExecutionPath::Snippet);
            assert!(*success);
        }
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "execution-started",
            "step-started",
            "fallback-started",
            "fallback-completed",
            "step-completed",
            "execution-completed"
        ]
    );
}

struct BrokenBrowser;

#[async_trait]
impl PageInspector for BrokenBrowser {
    async fn attach(&self, start_url: &str) -> Result<(), ExecutorError> {
        Err(ExecutorError::Unreachable(format!("cannot open {start_url}")))
    }

    async fn inspect(&self) -> PageContext {
        PageContext::unknown()
    }
}

#[tokio::test]
async fn initialization_failure_becomes_synthetic_step() {
    let snippet = ScriptedExecutor::new().succeeds("go()").shared();
    let spec = IntentSpec::new("init", vec![snippet_step("go", "go()")])
        .with_start_url("https://shop.example");
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared())
        .inspector(Arc::new(BrokenBrowser))
        .build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].index, -1);
    assert_eq!(report.steps[0].name, "initialization");
    assert!(report.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("cannot open https://shop.example"));
    assert!(!report.overall_success);
    assert_eq!(snippet.calls(), 0);
}

#[tokio::test]
async fn cancellation_is_checked_between_steps() {
    let token = CancellationToken::new();
    let snippet = ScriptedExecutor::new()
        .succeeds("one()")
        .succeeds("two()")
        .cancels_after("one()", token.clone())
        .shared();
    let spec = IntentSpec::new(
        "cancel",
        vec![snippet_step("one", "one()"), snippet_step("two", "two()")],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared())
        .cancellation(token)
        .build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();

    assert_eq!(report.steps.len(), 1);
    assert!(report.steps[0].success);
    assert!(report.cancelled);
    assert!(!report.overall_success);
    assert_eq!(snippet.calls(), 1);
}

#[tokio::test]
async fn invalid_spec_is_rejected_up_front() {
    let snippet = ScriptedExecutor::new().shared();
    let spec = IntentSpec::new(
        "bad",
        vec![snippet_step("loop", "x()").with_fallback(FallbackPath::Snippet)],
    );
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared()).build();
    let result = orchestrator.run(&spec, &Variables::new()).await;
    assert!(matches!(result, Err(FlowError::ValidationFailed(_))));
    assert_eq!(snippet.calls(), 0);
}

#[tokio::test]
async fn validations_do_not_enter_the_report() {
    let snippet = ScriptedExecutor::new()
        .succeeds("go()")
        .fails("check()", "assertion failed")
        .shared();
    let spec = IntentSpec::new("validated", vec![snippet_step("go", "go()")])
        .with_validations(vec![snippet_step("check", "check()")]);
    let orchestrator = ExecutionOrchestrator::builder(snippet.clone(), ScriptedExecutor::new().shared()).build();
    let report = orchestrator.run(&spec, &Variables::new()).await.unwrap();
    assert_eq!(report.steps.len(), 1);
    assert!(report.overall_success);
    assert_eq!(snippet.calls(), 2);
}
