use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::AgentError;
use crate::llm_provider::JudgmentProvider;
use crate::model::JudgmentRequest;

/// Pull the first JSON object out of a free-form model answer.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    raw.split('{').nth(1).and_then(|rest| {
        let mut depth = 1i32;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut candidate = String::from("{");
                        candidate.push_str(&rest[..=idx]);
                        return Some(trim_symmetric(&candidate));
                    }
                }
                _ => {}
            }
        }
        None
    })
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

/// Call the provider under a time budget and decode its JSON answer.
pub async fn request_json<T>(
    provider: &dyn JudgmentProvider,
    request: &JudgmentRequest,
    budget: Duration,
) -> Result<T, AgentError>
where
    T: DeserializeOwned,
{
    let raw = tokio::time::timeout(budget, provider.complete(request))
        .await
        .map_err(|_| AgentError::Timeout(budget.as_millis() as u64))??;
    debug!(
        provider = provider.name(),
        purpose = request.purpose.as_str(),
        bytes = raw.len(),
        "judgment response received"
    );
    let json = extract_json_object(&raw)
        .ok_or_else(|| AgentError::malformed("response contains no JSON object"))?;
    serde_json::from_str(&json).map_err(|err| AgentError::malformed(err.to_string()))
}
