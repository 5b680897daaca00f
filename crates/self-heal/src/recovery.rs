//! Recovery-action generation
//!
//! Deterministic actions come from [`ACTION_TABLE`]; alternative code comes
//! from the judgment service and is optional.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::PageContext;
use agent_core::{request_json, AgentError, JudgmentProvider, JudgmentPurpose, JudgmentRequest};
use serde::{Deserialize, Serialize};
use soulbrowser_core_types::Step;
use tracing::{debug, warn};

use crate::taxonomy::ErrorType;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ALTERNATIVES: usize = 3;
const ALTERNATIVE_CONFIDENCES: [f64; MAX_ALTERNATIVES] = [0.9, 0.7, 0.5];

const ALTERNATIVES_PROMPT: &str = "You repair failing browser automation steps. \
Given the step, its automation code and the error it raised, propose up to three replacement snippets. \
Reply with a single JSON object: {\"alternatives\": [{\"code\": <string>, \"explanation\": <short string>}]}.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryActionKind {
    Retry,
    Wait,
    UseAlternatePath,
    AlternateSelector,
    Refresh,
    NavigateBack,
    Skip,
}

impl RecoveryActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryActionKind::Retry => "retry",
            RecoveryActionKind::Wait => "wait",
            RecoveryActionKind::UseAlternatePath => "use_alternate_path",
            RecoveryActionKind::AlternateSelector => "alternate_selector",
            RecoveryActionKind::Refresh => "refresh",
            RecoveryActionKind::NavigateBack => "navigate_back",
            RecoveryActionKind::Skip => "skip",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub kind: RecoveryActionKind,
    pub confidence: f64,
    pub description: String,
    /// Concrete hint for carrying the action out (path name, selector, delay).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

/// Alternative code proposed by the judgment service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlternativeApproach {
    pub code: String,
    pub explanation: String,
    pub confidence: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Condition {
    Always,
    OptionalStep,
    EarlyRetry,
}

#[derive(Clone, Copy, Debug)]
struct ActionTemplate {
    error_type: Option<ErrorType>,
    kind: RecoveryActionKind,
    confidence: f64,
    condition: Condition,
}

/// `error_type: None` rows apply to every type without rows of its own.
const ACTION_TABLE: &[ActionTemplate] = &[
    ActionTemplate {
        error_type: Some(ErrorType::Selector),
        kind: RecoveryActionKind::UseAlternatePath,
        confidence: 0.85,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Selector),
        kind: RecoveryActionKind::AlternateSelector,
        confidence: 0.7,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Selector),
        kind: RecoveryActionKind::Skip,
        confidence: 0.9,
        condition: Condition::OptionalStep,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Timeout),
        kind: RecoveryActionKind::Wait,
        confidence: 0.7,
        condition: Condition::EarlyRetry,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Timeout),
        kind: RecoveryActionKind::Refresh,
        confidence: 0.6,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Timeout),
        kind: RecoveryActionKind::UseAlternatePath,
        confidence: 0.8,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Network),
        kind: RecoveryActionKind::Retry,
        confidence: 0.8,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Network),
        kind: RecoveryActionKind::NavigateBack,
        confidence: 0.5,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Validation),
        kind: RecoveryActionKind::UseAlternatePath,
        confidence: 0.9,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: Some(ErrorType::Validation),
        kind: RecoveryActionKind::Skip,
        confidence: 0.4,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: None,
        kind: RecoveryActionKind::UseAlternatePath,
        confidence: 0.7,
        condition: Condition::Always,
    },
    ActionTemplate {
        error_type: None,
        kind: RecoveryActionKind::Skip,
        confidence: 0.5,
        condition: Condition::Always,
    },
];

const EARLY_RETRY_LIMIT: u32 = 2;

#[derive(Debug, Deserialize)]
struct AlternativesReply {
    #[serde(default)]
    alternatives: Vec<AlternativeEntry>,
}

#[derive(Debug, Deserialize)]
struct AlternativeEntry {
    #[serde(default)]
    code: String,
    #[serde(default)]
    explanation: String,
}

/// Turns classified failures into ranked recovery actions.
#[derive(Clone)]
pub struct RecoveryPlanner {
    provider: Option<Arc<dyn JudgmentProvider>>,
    timeout: Duration,
}

impl Default for RecoveryPlanner {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RecoveryPlanner {
    pub fn new(provider: Option<Arc<dyn JudgmentProvider>>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Table-driven actions, highest confidence first.
    pub fn generate(
        &self,
        error_type: ErrorType,
        root_cause: &str,
        step: &Step,
        retry_count: u32,
    ) -> Vec<RecoveryAction> {
        let has_specific_rows = ACTION_TABLE
            .iter()
            .any(|row| row.error_type == Some(error_type));
        let mut actions: Vec<RecoveryAction> = ACTION_TABLE
            .iter()
            .filter(|row| {
                if has_specific_rows {
                    row.error_type == Some(error_type)
                } else {
                    row.error_type.is_none()
                }
            })
            .filter(|row| match row.condition {
                Condition::Always => true,
                Condition::OptionalStep => step.continue_on_failure,
                Condition::EarlyRetry => retry_count < EARLY_RETRY_LIMIT,
            })
            .map(|row| materialize(row, root_cause, step, retry_count))
            .collect();
        actions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        actions
    }

    /// Ask the judgment service for replacement code.
    ///
    /// Any failure yields an empty list.
    pub async fn suggest_alternatives(
        &self,
        step: &Step,
        error: &str,
        error_type: ErrorType,
        page: Option<&PageContext>,
    ) -> Vec<AlternativeApproach> {
        let Some(provider) = self.provider.as_ref() else {
            return Vec::new();
        };
        match self
            .request_alternatives(provider.as_ref(), step, error, error_type, page)
            .await
        {
            Ok(alternatives) => {
                debug!(step = %step.name, count = alternatives.len(), "alternative code received");
                alternatives
            }
            Err(err) => {
                warn!(
                    step = %step.name,
                    provider = provider.name(),
                    error = %err,
                    "alternative generation failed; continuing without alternatives"
                );
                Vec::new()
            }
        }
    }

    async fn request_alternatives(
        &self,
        provider: &dyn JudgmentProvider,
        step: &Step,
        error: &str,
        error_type: ErrorType,
        page: Option<&PageContext>,
    ) -> Result<Vec<AlternativeApproach>, AgentError> {
        let user = format!(
            "Step: {}\nInstruction: {}\nCurrent code:\n{}\nError ({}): {}",
            step.name,
            if step.instruction_text.is_empty() { "(none)" } else { step.instruction_text.as_str() },
            if step.snippet_code.is_empty() { "(none)" } else { step.snippet_code.as_str() },
            error_type,
            error
        );
        let mut request = JudgmentRequest::new(JudgmentPurpose::AlternativeCode, ALTERNATIVES_PROMPT, user);
        if let Some(page) = page {
            request = request.with_page_context(page.clone());
        }
        let reply: AlternativesReply = request_json(provider, &request, self.timeout).await?;
        Ok(reply
            .alternatives
            .into_iter()
            .filter(|entry| !entry.code.trim().is_empty())
            .take(MAX_ALTERNATIVES)
            .zip(ALTERNATIVE_CONFIDENCES)
            .map(|(entry, confidence)| AlternativeApproach {
                code: entry.code,
                explanation: entry.explanation,
                confidence,
            })
            .collect())
    }
}

fn materialize(
    row: &ActionTemplate,
    root_cause: &str,
    step: &Step,
    retry_count: u32,
) -> RecoveryAction {
    let alternate = step.preferred_path.other();
    let (description, implementation) = match row.kind {
        RecoveryActionKind::UseAlternatePath => (
            format!("run the step on the {alternate} path instead ({root_cause})"),
            Some(alternate.as_str().to_string()),
        ),
        RecoveryActionKind::AlternateSelector => (
            "retry with a more stable selector for the target element".to_string(),
            step.selector_hint.clone(),
        ),
        RecoveryActionKind::Skip => (
            "skip this step and continue the run".to_string(),
            None,
        ),
        RecoveryActionKind::Wait => {
            let delay_ms = 1_000 * u64::from(retry_count + 1);
            (
                format!("wait {delay_ms}ms for the page to settle, then retry"),
                Some(format!("{delay_ms}ms")),
            )
        }
        RecoveryActionKind::Refresh => (
            "reload the page and retry the step".to_string(),
            None,
        ),
        RecoveryActionKind::Retry => (
            "retry with an extended timeout".to_string(),
            Some("timeout x2".to_string()),
        ),
        RecoveryActionKind::NavigateBack => (
            "navigate back and retry from the previous page".to_string(),
            None,
        ),
    };
    RecoveryAction {
        kind: row.kind,
        confidence: row.confidence,
        description,
        implementation,
    }
}
