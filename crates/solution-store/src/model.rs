use chrono::{DateTime, Utc};
use self_heal::{ErrorType, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signature::{error_signature, normalize_error};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatistics {
    pub total_uses: u64,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub first_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avg_duration_ms: f64,
}

/// A stored, reusable remediation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub id: String,
    pub error_signature: String,
    /// Normalized error message the solution was learned from.
    pub error_pattern: String,
    pub category: ErrorType,
    pub strategy: String,
    pub code: String,
    pub confidence: f64,
    pub actual_success_rate: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub usage_statistics: UsageStatistics,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolved_into: Option<String>,
    #[serde(default)]
    pub generation: u32,
    pub created_at: DateTime<Utc>,
}

impl Solution {
    pub(crate) fn from_candidate(candidate: SolutionCandidate, context: &ErrorContext) -> Self {
        let confidence = candidate.confidence.clamp(0.0, 1.0);
        let mut tags = candidate.tags;
        tags.extend(context.tags.iter().cloned());
        tags.push(context.error_type.as_str().to_string());
        let mut seen = std::collections::HashSet::new();
        tags.retain(|tag| seen.insert(tag.to_lowercase()));
        Self {
            id: Uuid::new_v4().to_string(),
            error_signature: context.signature(),
            error_pattern: normalize_error(&context.message),
            category: context.error_type,
            strategy: candidate.strategy,
            code: candidate.code,
            confidence,
            actual_success_rate: confidence,
            tags,
            usage_statistics: UsageStatistics::default(),
            deprecated: false,
            parent_id: None,
            evolved_into: None,
            generation: 0,
            created_at: Utc::now(),
        }
    }

    /// Successor of `parent` carrying the replacement code of `candidate`.
    pub(crate) fn derived(parent: &Solution, candidate: SolutionCandidate, context: &ErrorContext) -> Self {
        let mut child = Self::from_candidate(candidate, context);
        if !child.tags.iter().any(|tag| tag == "evolved") {
            child.tags.push("evolved".to_string());
        }
        child.parent_id = Some(parent.id.clone());
        child.generation = parent.generation + 1;
        child
    }
}

/// The failure a lookup or store call is about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub message: String,
    pub error_type: ErrorType,
    #[serde(default)]
    pub step_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            message: message.into(),
            error_type,
            step_name: None,
            url: None,
            tags: Vec::new(),
        }
    }

    pub fn with_step(mut self, step_name: impl Into<String>) -> Self {
        self.step_name = Some(step_name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn signature(&self) -> String {
        error_signature(&self.message)
    }
}

/// A remediation that worked once and is offered for storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionCandidate {
    pub code: String,
    pub strategy: String,
    pub confidence: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SolutionCandidate {
    pub fn new(code: impl Into<String>, strategy: impl Into<String>, confidence: f64) -> Self {
        Self {
            code: code.into(),
            strategy: strategy.into(),
            confidence,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl From<Severity> for Urgency {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Urgency::Low,
            Severity::Medium => Urgency::Normal,
            Severity::High => Urgency::High,
            Severity::Critical => Urgency::Critical,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Exact,
    Fuzzy,
    Category,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSolution {
    pub solution: Solution,
    pub stage: MatchStage,
    pub relevance: f64,
    pub score: f64,
    pub estimated_duration_ms: u64,
    pub risk_note: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionLookup {
    pub solutions: Vec<RankedSolution>,
    /// Consult the judgment service directly.
    pub fallback_required: bool,
}

impl SolutionLookup {
    pub fn best(&self) -> Option<&RankedSolution> {
        self.solutions.first()
    }
}

/// Store tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionStoreConfig {
    /// Success rate below which a solution is deprecated...
    pub deprecation_threshold: f64,
    /// ...once it has at least this many uses.
    pub deprecation_min_uses: u64,
    pub evolve_after_failures: u32,
    pub min_relevance: f64,
    pub high_confidence: f64,
    pub fuzzy_threshold: f64,
    pub category_relevance: f64,
    pub max_results: usize,
    pub default_estimate_ms: u64,
    /// Floor for the incremental-average weight, so old solutions still move.
    pub min_learning_rate: f64,
}

impl Default for SolutionStoreConfig {
    fn default() -> Self {
        Self {
            deprecation_threshold: 0.3,
            deprecation_min_uses: 5,
            evolve_after_failures: 3,
            min_relevance: 0.25,
            high_confidence: 0.8,
            fuzzy_threshold: 0.5,
            category_relevance: 0.3,
            max_results: 5,
            default_estimate_ms: 2_000,
            min_learning_rate: 0.1,
        }
    }
}
