//! Recorded intent model.

use serde::{Deserialize, Serialize};

use crate::{ExecutionPath, FallbackPath, SoulError};

/// Ordered, named automation unit produced by the recording pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_url: String,
    /// Declared variable names available to `{{VAR}}` substitution.
    #[serde(default)]
    pub params: Vec<String>,
    pub steps: Vec<Step>,
    /// Informational checks run after the main loop; never part of the report's steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Step>,
}

impl IntentSpec {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            ..Self::default()
        }
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    pub fn with_validations(mut self, validations: Vec<Step>) -> Self {
        self.validations = validations;
        self
    }

    pub fn validate(&self) -> Result<(), SoulError> {
        if self.name.trim().is_empty() {
            return Err(SoulError::invalid_spec("intent name cannot be empty"));
        }
        for (index, step) in self.steps.iter().chain(self.validations.iter()).enumerate() {
            step.validate()
                .map_err(|err| SoulError::invalid_spec(format!("step #{index}: {err}")))?;
        }
        Ok(())
    }
}

/// One unit of work within an intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub instruction_text: String,
    #[serde(default)]
    pub snippet_code: String,
    pub preferred_path: ExecutionPath,
    #[serde(default)]
    pub fallback_path: FallbackPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub continue_on_failure: bool,
}

impl Step {
    pub fn new(name: impl Into<String>, preferred_path: ExecutionPath) -> Self {
        Self {
            name: name.into(),
            instruction_text: String::new(),
            snippet_code: String::new(),
            preferred_path,
            fallback_path: FallbackPath::None,
            selector_hint: None,
            value: None,
            continue_on_failure: false,
        }
    }

    pub fn with_instruction(mut self, text: impl Into<String>) -> Self {
        self.instruction_text = text.into();
        self
    }

    pub fn with_snippet(mut self, code: impl Into<String>) -> Self {
        self.snippet_code = code.into();
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPath) -> Self {
        self.fallback_path = fallback;
        self
    }

    pub fn with_selector_hint(mut self, selector: impl Into<String>) -> Self {
        self.selector_hint = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn continue_on_failure(mut self, enabled: bool) -> Self {
        self.continue_on_failure = enabled;
        self
    }

    /// Path attempted after the preferred one fails, if any.
    pub fn fallback(&self) -> Option<ExecutionPath> {
        self.fallback_path.as_path()
    }

    pub fn validate(&self) -> Result<(), SoulError> {
        if self.name.trim().is_empty() {
            return Err(SoulError::invalid_spec("step name cannot be empty"));
        }
        if self.fallback() == Some(self.preferred_path) {
            return Err(SoulError::invalid_spec(format!(
                "step '{}' falls back to its preferred path ({})",
                self.name, self.preferred_path
            )));
        }
        Ok(())
    }
}
