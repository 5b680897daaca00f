//! Values exchanged with collaborators

use serde::{Deserialize, Serialize};

use crate::errors::ExecutorError;

/// Result of one executor call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
}

impl ExecOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            screenshots: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            screenshots: Vec::new(),
        }
    }

    pub fn with_screenshots(mut self, screenshots: Vec<String>) -> Self {
        self.screenshots = screenshots;
        self
    }

    /// Error message, falling back to a generic one when the executor gave none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "step reported failure without an error message".to_string())
    }
}

impl From<ExecutorError> for ExecOutcome {
    fn from(err: ExecutorError) -> Self {
        ExecOutcome::failure(err.to_string())
    }
}

/// Read-only snapshot of the current page used when analysing failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub has_dialog: bool,
    #[serde(default)]
    pub has_error_elements: bool,
    #[serde(default = "default_online")]
    pub online: bool,
    /// Last page load time in milliseconds, if the inspector measured it.
    #[serde(default)]
    pub load_time_ms: Option<u64>,
    /// Round-trip latency to the page's origin in milliseconds.
    #[serde(default)]
    pub network_latency_ms: Option<u64>,
    /// Whether the DOM stopped mutating recently.
    #[serde(default)]
    pub dom_stable: Option<bool>,
    /// Whether the step's target element is visible.
    #[serde(default)]
    pub element_visible: Option<bool>,
}

fn default_online() -> bool {
    true
}

impl PageContext {
    /// Context used when no inspection was possible.
    pub fn unknown() -> Self {
        Self {
            url: None,
            title: None,
            has_dialog: false,
            has_error_elements: false,
            online: true,
            load_time_ms: None,
            network_latency_ms: None,
            dom_stable: None,
            element_visible: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_error_becomes_failed_outcome() {
        let outcome: ExecOutcome = ExecutorError::EmptySnippet.into();
        assert!(!outcome.success);
        assert_eq!(outcome.error_message(), "snippet code is empty");
    }

    #[test]
    fn page_context_defaults_to_online() {
        let ctx: PageContext = serde_json::from_str(r#"{"url":"https://a.test"}"#).unwrap();
        assert!(ctx.online);
        assert_eq!(ctx.url.as_deref(), Some("https://a.test"));
        assert!(ctx.dom_stable.is_none());
    }
}
