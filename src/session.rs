//! Replay session
//!
//! A session owns the long-lived state shared by every run it drives: the
//! solution store, the error history, the lifecycle bus and the judgment
//! provider. Orchestrators are cheap and built per run from that state.

use std::sync::Arc;
use std::time::Duration;

use action_flow::{ExecutionOrchestrator, RecoveryEngine};
use action_primitives::{
    DetachedPageInspector, PageInspector, ReasoningExecutor, SnippetExecutor, UnconfiguredExecutor,
};
use agent_core::JudgmentProvider;
use path_judge::PathJudge;
use self_heal::{ErrorAnalysis, ErrorAnalyzer, ErrorHistory, RecoveryPlanner};
use solution_store::{SharedSolutionStore, SolutionStore};
use soulbrowser_core_types::{ExecutionReport, IntentSpec, Step, Variables};
use soulbrowser_event_bus::{EventBus, ExecutionBus, ExecutionEvent, InMemoryBus};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::ReplayError;
use crate::executors::{ProcessSnippetExecutor, RemotePageInspector, RemoteReasoningExecutor};
use crate::llm::{OpenAiConfig, OpenAiJudgmentProvider};

pub struct ReplaySession {
    config: Config,
    store: SharedSolutionStore,
    history: Arc<ErrorHistory>,
    bus: Arc<InMemoryBus<ExecutionEvent>>,
    judgment: Option<Arc<dyn JudgmentProvider>>,
    snippet: Arc<dyn SnippetExecutor>,
    reasoning: Arc<dyn ReasoningExecutor>,
    inspector: Arc<dyn PageInspector>,
    cancel: CancellationToken,
}

impl ReplaySession {
    /// Build a session with the collaborators described by `config`.
    ///
    /// Paths without configuration get an executor that always fails, so
    /// their steps fall through to the fallback path.
    pub fn from_config(config: Config) -> Result<Self, ReplayError> {
        let snippet: Arc<dyn SnippetExecutor> =
            match ProcessSnippetExecutor::from_config(&config.executors.snippet) {
                Some(executor) => Arc::new(executor),
                None => Arc::new(UnconfiguredExecutor::snippet()),
            };
        let reasoning: Arc<dyn ReasoningExecutor> = if config.executors.reasoning.endpoint.is_some() {
            Arc::new(RemoteReasoningExecutor::from_config(&config.executors.reasoning)?)
        } else {
            Arc::new(UnconfiguredExecutor::reasoning())
        };
        let inspector: Arc<dyn PageInspector> = match config.executors.inspector.endpoint.as_deref() {
            Some(endpoint) => Arc::new(RemotePageInspector::new(
                endpoint,
                Duration::from_millis(config.executors.inspector.request_timeout_ms),
            )?),
            None => Arc::new(DetachedPageInspector),
        };
        let judgment: Option<Arc<dyn JudgmentProvider>> = if config.llm.is_configured() {
            Some(Arc::new(OpenAiJudgmentProvider::new(OpenAiConfig::from(&config.llm))?))
        } else {
            None
        };

        Self::with_collaborators(config, snippet, reasoning)
            .map(|session| session.with_inspector(inspector).with_judgment(judgment))
    }

    /// Session with explicit executors, no inspector and no judgment service.
    pub fn with_collaborators(
        config: Config,
        snippet: Arc<dyn SnippetExecutor>,
        reasoning: Arc<dyn ReasoningExecutor>,
    ) -> Result<Self, ReplayError> {
        let store = match config.solutions.path.as_ref() {
            Some(path) => SolutionStore::with_persistence(path, config.solutions.store.clone())?,
            None => SolutionStore::new(config.solutions.store.clone()),
        };
        let history = Arc::new(ErrorHistory::new(config.recovery.history_capacity));
        let bus = InMemoryBus::new(config.execution.event_capacity);
        debug!(
            solutions = store.len(),
            persisted = store.storage_path().is_some(),
            "replay session created"
        );
        Ok(Self {
            config,
            store: Arc::new(store),
            history,
            bus,
            judgment: None,
            snippet,
            reasoning,
            inspector: Arc::new(DetachedPageInspector),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn PageInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_judgment(mut self, provider: Option<Arc<dyn JudgmentProvider>>) -> Self {
        self.judgment = provider;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SharedSolutionStore {
        &self.store
    }

    pub fn history(&self) -> &Arc<ErrorHistory> {
        &self.history
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.bus.subscribe()
    }

    pub fn has_judgment(&self) -> bool {
        self.judgment.is_some()
    }

    /// Session-wide token; each run gets a child of it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn judge(&self) -> PathJudge {
        PathJudge::new(self.judgment.clone())
            .with_weights(self.config.decision.weights.clone())
            .with_timeout(self.config.decision.timeout())
    }

    pub fn analyzer(&self) -> ErrorAnalyzer {
        let planner = RecoveryPlanner::new(self.judgment.clone())
            .with_timeout(self.config.recovery.alternatives_timeout());
        ErrorAnalyzer::new(planner, self.history.clone()).with_inspector(self.inspector.clone())
    }

    pub fn orchestrator(&self) -> ExecutionOrchestrator {
        let bus: Arc<ExecutionBus> = self.bus.clone();
        let recovery = RecoveryEngine::new(self.analyzer(), self.judge())
            .with_store(self.store.clone())
            .with_options(self.config.recovery_options());
        ExecutionOrchestrator::builder(self.snippet.clone(), self.reasoning.clone())
            .inspector(self.inspector.clone())
            .timeouts(self.config.execution.timeouts())
            .bus(bus)
            .recovery(recovery)
            .cancellation(self.cancel.child_token())
            .build()
    }

    /// Run `spec` on a fresh orchestrator.
    pub async fn run(
        &self,
        spec: &IntentSpec,
        variables: &Variables,
    ) -> Result<ExecutionReport, ReplayError> {
        let report = self.orchestrator().run(spec, variables).await?;
        info!(
            execution_id = %report.execution_id,
            success = report.overall_success,
            fallbacks = report.fallback_count,
            duration_ms = report.total_duration_ms,
            "replay finished"
        );
        Ok(report)
    }

    /// Analyse an error message for `step` without asking for alternatives.
    pub async fn classify(&self, step: &Step, error: &str, retry_count: Option<u32>) -> ErrorAnalysis {
        self.analyzer().analyze(step, error, retry_count, false).await
    }
}
