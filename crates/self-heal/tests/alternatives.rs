use std::sync::Arc;

use agent_core::{OfflineJudgmentProvider, StaticJudgmentProvider};
use self_heal::{ErrorAnalyzer, ErrorHistory, ErrorType, RecoveryPlanner};
use soulbrowser_core_types::{ExecutionPath, Step};

fn step() -> Step {
    Step::new("add to cart", ExecutionPath::Snippet)
        .with_snippet("await page.click('#add')")
        .with_instruction("Add the item to the cart")
}

#[tokio::test]
async fn alternatives_carry_decaying_confidence() {
    let reply = r#"Here you go:
```json
{"alternatives":[
  {"code":"await page.click('[data-testid=add]')","explanation":"test id"},
  {"code":"","explanation":"empty is dropped"},
  {"code":"await page.getByRole('button',{name:'Add'}).click()","explanation":"role"},
  {"code":"await page.click('text=Add')","explanation":"text"},
  {"code":"await page.click('button.add')","explanation":"class"}
]}
```"#;
    let planner = RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new(reply))));
    let alternatives = planner
        .suggest_alternatives(&step(), "element not found", ErrorType::Selector, None)
        .await;
    let confidences: Vec<f64> = alternatives.iter().map(|a| a.confidence).collect();
    assert_eq!(confidences, vec![0.9, 0.7, 0.5]);
    assert_eq!(alternatives[1].explanation, "role");
}

#[tokio::test]
async fn provider_failures_degrade_to_empty() {
    for planner in [
        RecoveryPlanner::new(Some(Arc::new(OfflineJudgmentProvider))),
        RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new("no json here")))),
        RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new(r#"{"alternatives":"nope"}"#)))),
        RecoveryPlanner::default(),
    ] {
        let alternatives = planner
            .suggest_alternatives(&step(), "element not found", ErrorType::Selector, None)
            .await;
        assert!(alternatives.is_empty());
    }
}

#[tokio::test]
async fn unrecoverable_failures_skip_alternatives() {
    let reply = r#"{"alternatives":[{"code":"retry()","explanation":"x"}]}"#;
    let planner = RecoveryPlanner::new(Some(Arc::new(StaticJudgmentProvider::new(reply))));
    let analyzer = ErrorAnalyzer::new(planner, Arc::new(ErrorHistory::default()));

    let login = Step::new("Login form submit", ExecutionPath::Snippet);
    let analysis = analyzer.analyze(&login, "element not found", Some(0), true).await;
    assert!(!analysis.is_recoverable);
    assert!(analysis.alternative_approaches.is_empty());

    let analysis = analyzer.analyze(&step(), "element not found", Some(0), true).await;
    assert!(analysis.is_recoverable);
    assert_eq!(analysis.best_alternative().map(|a| a.code.as_str()), Some("retry()"));
    assert_eq!(analyzer.history().len(), 2);
}
