//! Replay configuration
//!
//! Loaded from YAML. Every section carries defaults, so a missing or partial
//! file still yields a usable configuration; environment variables are
//! applied on top by [`Config::apply_overrides`].

use std::path::PathBuf;
use std::time::Duration;

use action_flow::{PathTimeouts, RecoveryOptions};
use path_judge::ScoringWeights;
use serde::{Deserialize, Serialize};
use solution_store::SolutionStoreConfig;

pub const ENV_LLM_API_KEY: &str = "SOUL_REPLAY_LLM_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_LLM_MODEL: &str = "SOUL_REPLAY_LLM_MODEL";
pub const ENV_LLM_API_BASE: &str = "SOUL_REPLAY_LLM_API_BASE";
pub const ENV_REASONING_ENDPOINT: &str = "SOUL_REPLAY_REASONING_ENDPOINT";
pub const ENV_REASONING_API_KEY: &str = "SOUL_REPLAY_REASONING_API_KEY";
pub const ENV_SOLUTIONS_PATH: &str = "SOUL_REPLAY_SOLUTIONS_PATH";
pub const ENV_CI: &str = "CI";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub decision: DecisionConfig,
    pub recovery: RecoveryConfig,
    pub solutions: SolutionsConfig,
    pub llm: LlmConfig,
    pub executors: ExecutorsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub snippet_timeout_ms: u64,
    pub reasoning_timeout_ms: u64,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let timeouts = PathTimeouts::default();
        Self {
            snippet_timeout_ms: timeouts.snippet_ms,
            reasoning_timeout_ms: timeouts.reasoning_ms,
            event_capacity: 1024,
        }
    }
}

impl ExecutionConfig {
    pub fn timeouts(&self) -> PathTimeouts {
        PathTimeouts {
            snippet_ms: self.snippet_timeout_ms,
            reasoning_ms: self.reasoning_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub timeout_ms: u64,
    /// Explicit CI flag. When unset, the `CI` environment variable decides.
    pub ci_environment: Option<bool>,
    pub weights: ScoringWeights,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            ci_environment: None,
            weights: ScoringWeights::default(),
        }
    }
}

impl DecisionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub max_step_retries: u32,
    pub alternatives_timeout_ms: u64,
    pub solution_budget_ms: u64,
    pub history_capacity: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        let options = RecoveryOptions::default();
        Self {
            max_step_retries: options.max_step_retries,
            alternatives_timeout_ms: 15_000,
            solution_budget_ms: options.solution_budget_ms,
            history_capacity: self_heal::history::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl RecoveryConfig {
    pub fn alternatives_timeout(&self) -> Duration {
        Duration::from_millis(self.alternatives_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionsConfig {
    /// JSON file backing the store. In-memory only when unset.
    pub path: Option<PathBuf>,
    pub store: SolutionStoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    /// Tried in order; the next key is used when one is rate limited.
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
            request_timeout_ms: 30_000,
        }
    }
}

impl LlmConfig {
    /// A judgment service is only wired up when enabled and keyed.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_keys.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorsConfig {
    pub snippet: SnippetRunnerConfig,
    pub reasoning: ReasoningAgentConfig,
    pub inspector: InspectorConfig,
}

/// Local process that receives snippet code on stdin, e.g. `["node", "runner.js"]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetRunnerConfig {
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningAgentConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ReasoningAgentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            request_timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub endpoint: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are ignored. `SOUL_REPLAY_LLM_API_KEY` wins over
    /// `OPENAI_API_KEY` and may hold a comma separated list.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(keys) = get(ENV_LLM_API_KEY).or_else(|| get(ENV_OPENAI_API_KEY)) {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
            if !keys.is_empty() {
                self.llm.api_keys = keys;
            }
        }
        if let Some(model) = get(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(base) = get(ENV_LLM_API_BASE) {
            self.llm.api_base = base;
        }
        if let Some(endpoint) = get(ENV_REASONING_ENDPOINT) {
            self.executors.reasoning.endpoint = Some(endpoint);
        }
        if let Some(key) = get(ENV_REASONING_API_KEY) {
            self.executors.reasoning.api_key = Some(key);
        }
        if let Some(path) = get(ENV_SOLUTIONS_PATH) {
            self.solutions.path = Some(PathBuf::from(path));
        }
        if self.decision.ci_environment.is_none() {
            let ci = get(ENV_CI)
                .map(|value| !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(false);
            self.decision.ci_environment = Some(ci);
        }
    }

    pub fn ci_environment(&self) -> bool {
        self.decision.ci_environment.unwrap_or(false)
    }

    pub fn recovery_options(&self) -> RecoveryOptions {
        RecoveryOptions {
            max_step_retries: self.recovery.max_step_retries,
            solution_budget_ms: self.recovery.solution_budget_ms,
            ci_environment: self.ci_environment(),
        }
    }
}
