//! Weighted scoring table for the rule-based path decision.
//!
//! Scores at or above `threshold` favour the snippet path, anything below
//! favours reasoning. The table is plain data so deployments can tune it
//! from configuration and tests can pin individual rules.

use serde::{Deserialize, Serialize};
use soulbrowser_core_types::ExecutionPath;

use crate::signals::{DecisionSignals, DomStability, SelectorStability, StepComplexity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base: i32,
    pub threshold: i32,
    pub ci_environment: i32,
    pub selector_high: i32,
    pub selector_medium: i32,
    pub selector_low: i32,
    pub element_hidden: i32,
    pub slow_page_load: i32,
    pub slow_page_load_ms: u64,
    pub previous_step_failed: i32,
    pub complexity_simple: i32,
    pub complexity_complex: i32,
    pub dom_settling: i32,
    pub dom_dynamic: i32,
    pub high_latency: i32,
    pub high_latency_ms: u64,
    /// Applied when the retry attempt is greater than one.
    pub repeated_retry: i32,
    /// Applied on the last allowed retry.
    pub final_retry: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 50,
            threshold: 50,
            ci_environment: 30,
            selector_high: 25,
            selector_medium: 0,
            selector_low: -30,
            element_hidden: -20,
            slow_page_load: -10,
            slow_page_load_ms: 3_000,
            previous_step_failed: -15,
            complexity_simple: 10,
            complexity_complex: -20,
            dom_settling: -10,
            dom_dynamic: -25,
            high_latency: -10,
            high_latency_ms: 1_000,
            repeated_retry: -15,
            final_retry: -10,
        }
    }
}

/// One rule that moved the score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleContribution {
    pub rule: &'static str,
    pub delta: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub score: i32,
    pub contributions: Vec<RuleContribution>,
}

impl ScoreBreakdown {
    pub fn choice(&self, weights: &ScoringWeights) -> ExecutionPath {
        if self.score >= weights.threshold {
            ExecutionPath::Snippet
        } else {
            ExecutionPath::Reasoning
        }
    }

    /// `clamp(|score| / 100, 0.3, 0.9)`
    pub fn confidence(&self) -> f64 {
        (f64::from(self.score.abs()) / 100.0).clamp(0.3, 0.9)
    }

    pub fn rationale(&self) -> String {
        if self.contributions.is_empty() {
            return format!("rule-based score {} (no adjustments)", self.score);
        }
        let parts = self
            .contributions
            .iter()
            .map(|c| format!("{} {:+}", c.rule, c.delta))
            .collect::<Vec<_>>()
            .join(", ");
        format!("rule-based score {}: {}", self.score, parts)
    }
}

impl ScoringWeights {
    pub fn score(&self, signals: &DecisionSignals) -> ScoreBreakdown {
        let mut contributions = Vec::new();
        let mut push = |rule: &'static str, delta: i32| {
            if delta != 0 {
                contributions.push(RuleContribution { rule, delta });
            }
        };

        if signals.ci_environment {
            push("ci_environment", self.ci_environment);
        }
        match signals.selector_stability {
            SelectorStability::High => push("selector_high", self.selector_high),
            SelectorStability::Medium => push("selector_medium", self.selector_medium),
            SelectorStability::Low => push("selector_low", self.selector_low),
        }
        if !signals.element_visible {
            push("element_hidden", self.element_hidden);
        }
        if signals
            .page_load_ms
            .is_some_and(|ms| ms > self.slow_page_load_ms)
        {
            push("slow_page_load", self.slow_page_load);
        }
        if !signals.previous_step_succeeded {
            push("previous_step_failed", self.previous_step_failed);
        }
        match signals.step_complexity {
            StepComplexity::Simple => push("complexity_simple", self.complexity_simple),
            StepComplexity::Moderate => {}
            StepComplexity::Complex => push("complexity_complex", self.complexity_complex),
        }
        match signals.dom_stability {
            DomStability::Stable => {}
            DomStability::Settling => push("dom_settling", self.dom_settling),
            DomStability::Dynamic => push("dom_dynamic", self.dom_dynamic),
        }
        if signals
            .network_latency_ms
            .is_some_and(|ms| ms > self.high_latency_ms)
        {
            push("high_latency", self.high_latency);
        }
        if signals.retry_attempt > 1 {
            push("repeated_retry", self.repeated_retry);
        }
        if signals.max_retries > 0 && signals.retry_attempt >= signals.max_retries {
            push("final_retry", self.final_retry);
        }

        let score = self.base + contributions.iter().map(|c| c.delta).sum::<i32>();
        ScoreBreakdown {
            score,
            contributions,
        }
    }
}
