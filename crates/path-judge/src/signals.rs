//! Environmental and contextual signals fed to the path decision.

use action_primitives::PageContext;
use serde::{Deserialize, Serialize};
use soulbrowser_core_types::Step;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStability {
    High,
    #[default]
    Medium,
    Low,
}

impl SelectorStability {
    /// Rough stability estimate from the recorded selector.
    ///
    /// Test ids and element ids survive redesigns; positional selectors and
    /// long XPaths do not.
    pub fn estimate(selector: Option<&str>) -> Self {
        let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
            return SelectorStability::Low;
        };
        let lower = selector.to_ascii_lowercase();
        if lower.contains("data-testid")
            || lower.contains("data-test")
            || lower.contains("aria-label")
            || (lower.starts_with('#') && !lower.contains(' '))
        {
            return SelectorStability::High;
        }
        if lower.contains("nth-child")
            || lower.contains("nth-of-type")
            || lower.starts_with("/html")
            || lower.matches('/').count() > 3
            || lower.matches(' ').count() > 3
        {
            return SelectorStability::Low;
        }
        SelectorStability::Medium
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepComplexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl StepComplexity {
    /// Word count of the instruction, plus a bump for multi-part goals.
    pub fn estimate(instruction: &str) -> Self {
        let words = instruction.split_whitespace().count();
        let conjunctions = instruction
            .split_whitespace()
            .filter(|w| matches!(w.to_ascii_lowercase().as_str(), "and" | "then" | "until" | "unless"))
            .count();
        match (words, conjunctions) {
            (0..=6, 0) => StepComplexity::Simple,
            (w, c) if w > 20 || c >= 2 => StepComplexity::Complex,
            _ => StepComplexity::Moderate,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomStability {
    #[default]
    Stable,
    Settling,
    Dynamic,
}

/// Inputs to [`crate::PathJudge::decide`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionSignals {
    pub ci_environment: bool,
    pub selector_stability: SelectorStability,
    pub element_visible: bool,
    pub page_load_ms: Option<u64>,
    pub previous_step_succeeded: bool,
    pub step_complexity: StepComplexity,
    pub dom_stability: DomStability,
    pub network_latency_ms: Option<u64>,
    pub retry_attempt: u32,
    pub max_retries: u32,
}

impl Default for DecisionSignals {
    fn default() -> Self {
        Self {
            ci_environment: false,
            selector_stability: SelectorStability::Medium,
            element_visible: true,
            page_load_ms: None,
            previous_step_succeeded: true,
            step_complexity: StepComplexity::Moderate,
            dom_stability: DomStability::Stable,
            network_latency_ms: None,
            retry_attempt: 0,
            max_retries: 0,
        }
    }
}

impl DecisionSignals {
    /// Derive signals for `step` from the page state and run history.
    pub fn for_step(step: &Step, page: &PageContext) -> Self {
        let dom_stability = match page.dom_stable {
            Some(true) => DomStability::Stable,
            Some(false) => DomStability::Dynamic,
            None if page.has_dialog => DomStability::Settling,
            None => DomStability::Stable,
        };
        Self {
            selector_stability: SelectorStability::estimate(step.selector_hint.as_deref()),
            element_visible: page.element_visible.unwrap_or(true),
            page_load_ms: page.load_time_ms,
            step_complexity: StepComplexity::estimate(&step.instruction_text),
            dom_stability,
            network_latency_ms: page.network_latency_ms,
            ..Self::default()
        }
    }

    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci_environment = ci;
        self
    }

    pub fn with_previous_step(mut self, succeeded: bool) -> Self {
        self.previous_step_succeeded = succeeded;
        self
    }

    pub fn with_retry(mut self, attempt: u32, max_retries: u32) -> Self {
        self.retry_attempt = attempt;
        self.max_retries = max_retries;
        self
    }
}
