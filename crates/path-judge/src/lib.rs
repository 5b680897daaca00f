//! Path Decision
//!
//! Picks the snippet or reasoning path for a step when the caller wants an
//! adaptive choice (for example on retries). The remote judgment service is
//! asked first; any failure there lands on a deterministic weighted score,
//! so [`PathJudge::decide`] always returns a concrete choice.

pub mod judge;
pub mod rules;
pub mod signals;

pub use judge::{DecisionSource, PathDecision, PathJudge};
pub use rules::{RuleContribution, ScoreBreakdown, ScoringWeights};
pub use signals::{DecisionSignals, DomStability, SelectorStability, StepComplexity};
