use std::time::Duration;

use agent_core::{AgentError, JudgmentProvider, JudgmentRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&LlmConfig> for OpenAiConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            api_keys: config.api_keys.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            temperature: config.temperature,
            timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }
}

/// OpenAI-compatible chat completions backend.
///
/// Keys are tried in order; a 429 moves on to the next key.
pub struct OpenAiJudgmentProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiJudgmentProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        if config.api_keys.is_empty() {
            return Err(AgentError::invalid_request("missing API key for judgment service"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AgentError::invalid_request(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn body(&self, request: &JudgmentRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_prompt(),
                },
            ],
        }
    }
}

#[async_trait]
impl JudgmentProvider for OpenAiJudgmentProvider {
    async fn complete(&self, request: &JudgmentRequest) -> Result<String, AgentError> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = self.body(request);

        let mut last_error: Option<AgentError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let response = match self.client.post(&url).bearer_auth(key).json(&body).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::unavailable(format!("openai request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "judgment request rate limited; switching API key"
                    );
                    last_error = Some(AgentError::unavailable(friendly));
                    continue;
                }
                return Err(AgentError::unavailable(format!("openai returned {status}: {text}")));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| AgentError::malformed(format!("openai response invalid: {err}")))?;
            if let Some(usage) = response.usage.as_ref() {
                debug!(
                    purpose = request.purpose.as_str(),
                    input_tokens = usage.prompt_tokens,
                    output_tokens = usage.completion_tokens,
                    "judgment tokens used"
                );
            }
            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| AgentError::malformed("openai response missing content"));
        }

        Err(last_error.unwrap_or_else(|| AgentError::unavailable("judgment request exhausted all API keys")))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("rate limit exceeded: {}", message.trim());
        }
    }
    "rate limit exceeded".to_string()
}
