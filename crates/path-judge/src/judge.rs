use std::sync::Arc;
use std::time::Duration;

use action_primitives::PageContext;
use agent_core::{request_json, AgentError, JudgmentProvider, JudgmentPurpose, JudgmentRequest};
use serde::{Deserialize, Serialize};
use soulbrowser_core_types::ExecutionPath;
use tracing::{debug, warn};

use crate::rules::ScoringWeights;
use crate::signals::DecisionSignals;

const SYSTEM_PROMPT: &str = "You choose how a browser automation step should run. \
\"snippet\" replays pre-recorded automation code: fast and cheap but brittle when selectors or page structure drift. \
\"reasoning\" lets an agent interpret the step's natural-language goal against the live page: slower and costlier but robust to change. \
Reply with a single JSON object: {\"choice\": \"snippet\" | \"reasoning\", \"confidence\": <number between 0 and 1>, \"rationale\": <short string>}.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Remote,
    RuleBased,
}

/// Outcome of a path decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathDecision {
    pub choice: ExecutionPath,
    pub confidence: f64,
    pub rationale: String,
    pub source: DecisionSource,
    /// Rule-based score, when the heuristic produced the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RemoteDecision {
    choice: String,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

/// Decides between the snippet and reasoning paths.
#[derive(Clone)]
pub struct PathJudge {
    provider: Option<Arc<dyn JudgmentProvider>>,
    weights: ScoringWeights,
    timeout: Duration,
}

impl PathJudge {
    pub fn new(provider: Option<Arc<dyn JudgmentProvider>>) -> Self {
        Self {
            provider,
            weights: ScoringWeights::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Judge that never calls out; always uses the scoring table.
    pub fn rule_based() -> Self {
        Self::new(None)
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Pick a path. Never fails.
    pub async fn decide(
        &self,
        signals: &DecisionSignals,
        context: Option<&PageContext>,
    ) -> PathDecision {
        if let Some(provider) = self.provider.as_ref() {
            match self.ask_remote(provider.as_ref(), signals, context).await {
                Ok(decision) => {
                    debug!(
                        choice = %decision.choice,
                        confidence = decision.confidence,
                        "remote path decision accepted"
                    );
                    return decision;
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        error = %err,
                        "remote path decision failed; using rule-based fallback"
                    );
                }
            }
        }
        self.decide_offline(signals)
    }

    /// Deterministic weighted-score decision.
    pub fn decide_offline(&self, signals: &DecisionSignals) -> PathDecision {
        let breakdown = self.weights.score(signals);
        PathDecision {
            choice: breakdown.choice(&self.weights),
            confidence: breakdown.confidence(),
            rationale: breakdown.rationale(),
            source: DecisionSource::RuleBased,
            score: Some(breakdown.score),
        }
    }

    async fn ask_remote(
        &self,
        provider: &dyn JudgmentProvider,
        signals: &DecisionSignals,
        context: Option<&PageContext>,
    ) -> Result<PathDecision, AgentError> {
        let mut request = JudgmentRequest::new(
            JudgmentPurpose::PathDecision,
            SYSTEM_PROMPT,
            build_user_prompt(signals)?,
        );
        if let Some(context) = context {
            request = request.with_page_context(context.clone());
        }
        let remote: RemoteDecision = request_json(provider, &request, self.timeout).await?;
        validate_remote(remote)
    }
}

fn build_user_prompt(signals: &DecisionSignals) -> Result<String, AgentError> {
    let payload = serde_json::to_string_pretty(signals)
        .map_err(|err| AgentError::invalid_request(err.to_string()))?;
    Ok(format!(
        "Execution signals for the step about to run:\n{payload}\n\nWhich path should run it?"
    ))
}

fn validate_remote(remote: RemoteDecision) -> Result<PathDecision, AgentError> {
    let choice = match remote.choice.trim().to_ascii_lowercase().as_str() {
        "snippet" => ExecutionPath::Snippet,
        "reasoning" => ExecutionPath::Reasoning,
        other => {
            return Err(AgentError::malformed(format!(
                "choice '{other}' is not snippet or reasoning"
            )))
        }
    };
    if !remote.confidence.is_finite() || !(0.0..=1.0).contains(&remote.confidence) {
        return Err(AgentError::malformed(format!(
            "confidence {} outside [0, 1]",
            remote.confidence
        )));
    }
    let rationale = if remote.rationale.trim().is_empty() {
        "remote judgment".to_string()
    } else {
        remote.rationale
    };
    Ok(PathDecision {
        choice,
        confidence: remote.confidence,
        rationale,
        source: DecisionSource::Remote,
        score: None,
    })
}
