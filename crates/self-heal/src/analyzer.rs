use std::sync::Arc;

use action_primitives::{PageContext, PageInspector};
use chrono::Utc;
use serde::Serialize;
use soulbrowser_core_types::Step;
use tracing::debug;

use crate::classifier::ErrorClassifier;
use crate::history::{ErrorHistory, ErrorRecord};
use crate::recovery::{AlternativeApproach, RecoveryAction, RecoveryPlanner};
use crate::taxonomy::{ErrorType, Severity};

/// Everything known about one failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorAnalysis {
    pub step_name: String,
    pub message: String,
    pub error_type: ErrorType,
    pub severity: Severity,
    pub is_recoverable: bool,
    pub root_cause: String,
    pub retry_count: u32,
    pub suggested_actions: Vec<RecoveryAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_context: Option<PageContext>,
    pub alternative_approaches: Vec<AlternativeApproach>,
}

impl ErrorAnalysis {
    pub fn top_action(&self) -> Option<&RecoveryAction> {
        self.suggested_actions.first()
    }

    pub fn best_alternative(&self) -> Option<&AlternativeApproach> {
        self.alternative_approaches.first()
    }
}

/// Classifies a failure, inspects the page and plans recovery.
#[derive(Clone)]
pub struct ErrorAnalyzer {
    classifier: ErrorClassifier,
    planner: RecoveryPlanner,
    history: Arc<ErrorHistory>,
    inspector: Option<Arc<dyn PageInspector>>,
}

impl ErrorAnalyzer {
    pub fn new(planner: RecoveryPlanner, history: Arc<ErrorHistory>) -> Self {
        Self {
            classifier: ErrorClassifier::default(),
            planner,
            history,
            inspector: None,
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn PageInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn history(&self) -> &Arc<ErrorHistory> {
        &self.history
    }

    pub fn planner(&self) -> &RecoveryPlanner {
        &self.planner
    }

    /// Analyse `error` raised by `step`.
    ///
    /// Without an explicit `retry_count` the number of earlier failures of
    /// the same step in the history is used. Alternatives are only requested
    /// for recoverable failures.
    pub async fn analyze(
        &self,
        step: &Step,
        error: &str,
        retry_count: Option<u32>,
        include_alternatives: bool,
    ) -> ErrorAnalysis {
        let retry_count = retry_count.unwrap_or_else(|| {
            self.history
                .recent_for_step(&step.name, self.history.capacity())
                .len() as u32
        });
        let verdict = self
            .classifier
            .assess(error, &step.name, step.continue_on_failure, retry_count);

        let page_context = match self.inspector.as_ref() {
            Some(inspector) => Some(inspector.inspect().await),
            None => None,
        };
        let root_cause = enrich_root_cause(&verdict.root_cause, page_context.as_ref());

        let suggested_actions =
            self.planner
                .generate(verdict.error_type, &root_cause, step, retry_count);
        let alternative_approaches = if include_alternatives && verdict.is_recoverable {
            self.planner
                .suggest_alternatives(step, error, verdict.error_type, page_context.as_ref())
                .await
        } else {
            Vec::new()
        };

        self.history.record(ErrorRecord {
            timestamp: Utc::now(),
            step_name: step.name.clone(),
            error_type: verdict.error_type,
            severity: verdict.severity,
            message: error.to_string(),
            retry_count,
        });
        debug!(
            step = %step.name,
            error_type = %verdict.error_type,
            severity = %verdict.severity,
            recoverable = verdict.is_recoverable,
            actions = suggested_actions.len(),
            alternatives = alternative_approaches.len(),
            "step failure analysed"
        );

        ErrorAnalysis {
            step_name: step.name.clone(),
            message: error.to_string(),
            error_type: verdict.error_type,
            severity: verdict.severity,
            is_recoverable: verdict.is_recoverable,
            root_cause,
            retry_count,
            suggested_actions,
            page_context,
            alternative_approaches,
        }
    }
}

fn enrich_root_cause(base: &str, page: Option<&PageContext>) -> String {
    let Some(page) = page else {
        return base.to_string();
    };
    let mut notes = Vec::new();
    if !page.online {
        notes.push("browser reports offline");
    }
    if page.has_dialog {
        notes.push("a modal dialog is open");
    }
    if page.has_error_elements {
        notes.push("the page shows error messages");
    }
    if notes.is_empty() {
        base.to_string()
    } else {
        format!("{base}; {}", notes.join("; "))
    }
}
