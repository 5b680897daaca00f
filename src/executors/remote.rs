use std::time::Duration;

use action_primitives::{ExecOutcome, ExecutorError, PageContext, PageInspector, ReasoningExecutor};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use soulbrowser_core_types::Variables;
use tracing::{debug, warn};

use crate::config::ReasoningAgentConfig;
use crate::errors::ReplayError;

fn http_client(timeout: Duration) -> Result<Client, ReplayError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ReplayError::config(format!("failed to build HTTP client: {err}")))
}

#[derive(Debug, Serialize)]
struct AgentTask<'a> {
    instruction: &'a str,
    variables: &'a Variables,
}

/// Hands instructions to a remote reasoning agent over HTTP.
///
/// The agent answers with an [`ExecOutcome`] JSON body.
pub struct RemoteReasoningExecutor {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl RemoteReasoningExecutor {
    pub fn from_config(config: &ReasoningAgentConfig) -> Result<Self, ReplayError> {
        Ok(Self {
            client: http_client(Duration::from_millis(config.request_timeout_ms))?,
            endpoint: config.endpoint.clone().filter(|e| !e.trim().is_empty()),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    async fn call(&self, instruction: &str, variables: &Variables) -> Result<ExecOutcome, ExecutorError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ExecutorError::NotConfigured("reasoning agent endpoint".to_string()))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ExecutorError::MissingCredential("reasoning agent API key".to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&AgentTask {
                instruction,
                variables,
            })
            .send()
            .await
            .map_err(|err| ExecutorError::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(ExecutorError::Execution(format!("agent returned {status}: {text}")));
        }
        response
            .json::<ExecOutcome>()
            .await
            .map_err(|err| ExecutorError::Execution(format!("agent response invalid: {err}")))
    }
}

#[async_trait]
impl ReasoningExecutor for RemoteReasoningExecutor {
    async fn execute(&self, instruction: &str, variables: &Variables) -> ExecOutcome {
        if instruction.trim().is_empty() {
            return ExecutorError::EmptyInstruction.into();
        }
        match self.call(instruction, variables).await {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(error = %err, "reasoning agent call failed");
                err.into()
            }
        }
    }
}

/// Reads page state from `<endpoint>/page-context`.
pub struct RemotePageInspector {
    client: Client,
    url: String,
}

impl RemotePageInspector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ReplayError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: format!("{}/page-context", endpoint.trim_end_matches('/')),
        })
    }

    async fn fetch(&self) -> Result<PageContext, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<PageContext>()
            .await
    }
}

#[async_trait]
impl PageInspector for RemotePageInspector {
    async fn inspect(&self) -> PageContext {
        match self.fetch().await {
            Ok(context) => context,
            Err(err) => {
                warn!(url = %self.url, error = %err, "page inspection failed; context unknown");
                PageContext::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn agent(endpoint: Option<String>, api_key: Option<&str>) -> RemoteReasoningExecutor {
        RemoteReasoningExecutor::from_config(&ReasoningAgentConfig {
            endpoint,
            api_key: api_key.map(str::to_string),
            request_timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn rejects_before_calling_out() {
        let vars = Variables::new();
        let empty = agent(Some("http://127.0.0.1:9".into()), Some("k"))
            .execute("   ", &vars)
            .await;
        assert_eq!(empty.error_message(), "instruction text is empty");

        let no_endpoint = agent(None, Some("k")).execute("click buy", &vars).await;
        assert!(no_endpoint.error_message().contains("no executor configured"));

        let no_key = agent(Some("http://127.0.0.1:9".into()), None)
            .execute("click buy", &vars)
            .await;
        assert!(no_key.error_message().contains("missing credential"));
    }

    #[tokio::test]
    async fn posts_instruction_with_bearer_credential() {
        let server = MockServer::start_async().await;
        let run = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/run")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({"instruction": "sign in", "variables": {"EMAIL": "a@b.c"}}));
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let mut vars = Variables::new();
        vars.insert("EMAIL".into(), "a@b.c".into());
        let outcome = agent(Some(server.url("/run")), Some("secret"))
            .execute("sign in", &vars)
            .await;
        assert!(outcome.success, "{:?}", outcome.error);
        run.assert_async().await;
    }

    #[tokio::test]
    async fn agent_errors_become_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/refused");
                then.status(200)
                    .json_body(json!({"success": false, "error": "button hidden"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/busy");
                then.status(503).body("overloaded");
            })
            .await;

        let vars = Variables::new();
        let refused = agent(Some(server.url("/refused")), Some("k"))
            .execute("click buy", &vars)
            .await;
        assert_eq!(refused.error_message(), "button hidden");
        let unavailable = agent(Some(server.url("/busy")), Some("k"))
            .execute("click buy", &vars)
            .await;
        assert!(unavailable.error_message().contains("503"));
        assert!(unavailable.error_message().contains("overloaded"));
    }

    #[tokio::test]
    async fn inspector_reads_page_context() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/page-context");
                then.status(200).json_body(json!({
                    "url": "https://shop.test/cart",
                    "hasDialog": true,
                    "domStable": false
                }));
            })
            .await;

        let inspector =
            RemotePageInspector::new(&format!("{}/", server.base_url()), Duration::from_secs(5)).unwrap();
        let context = inspector.inspect().await;
        assert_eq!(context.url.as_deref(), Some("https://shop.test/cart"));
        assert!(context.has_dialog);
        assert_eq!(context.dom_stable, Some(false));
        page.assert_async().await;
    }

    #[tokio::test]
    async fn inspector_failure_yields_unknown_context() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/page-context");
                then.status(500).json_body(json!({}));
            })
            .await;

        let inspector = RemotePageInspector::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        assert_eq!(inspector.inspect().await, PageContext::unknown());
    }
}
