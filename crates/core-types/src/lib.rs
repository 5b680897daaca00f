//! Shared primitives for SoulBrowser adaptive replay.
//!
//! Everything that crosses a crate boundary lives here: the recorded
//! intent model, the per-step and per-run reports, and the small id and
//! path types the engine passes around.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod intent;
pub mod report;
pub mod template;

pub use intent::{IntentSpec, Step};
pub use report::{ExecutionReport, StepExecutionResult, INITIALIZATION_STEP_INDEX};
pub use template::{substitute_variables, Variables};

/// Shared error type for configuration-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SoulError {
    #[error("{message}")]
    Message { message: String },

    #[error("invalid intent spec: {0}")]
    InvalidSpec(String),

    #[error("unknown execution path '{0}'")]
    UnknownPath(String),
}

impl SoulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec(message.into())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two ways a step can be carried out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Deterministic, pre-authored automation code.
    Snippet,
    /// Natural-language instruction interpreted against the live page.
    #[serde(alias = "ai")]
    Reasoning,
}

impl ExecutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Snippet => "snippet",
            ExecutionPath::Reasoning => "reasoning",
        }
    }

    pub fn other(&self) -> ExecutionPath {
        match self {
            ExecutionPath::Snippet => ExecutionPath::Reasoning,
            ExecutionPath::Reasoning => ExecutionPath::Snippet,
        }
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPath {
    type Err = SoulError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "snippet" => Ok(ExecutionPath::Snippet),
            "reasoning" | "ai" => Ok(ExecutionPath::Reasoning),
            other => Err(SoulError::UnknownPath(other.to_string())),
        }
    }
}

/// Where a step goes after its preferred path fails.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPath {
    Snippet,
    #[serde(alias = "ai")]
    Reasoning,
    #[default]
    None,
}

impl FallbackPath {
    pub fn as_path(&self) -> Option<ExecutionPath> {
        match self {
            FallbackPath::Snippet => Some(ExecutionPath::Snippet),
            FallbackPath::Reasoning => Some(ExecutionPath::Reasoning),
            FallbackPath::None => None,
        }
    }
}

impl From<ExecutionPath> for FallbackPath {
    fn from(path: ExecutionPath) -> Self {
        match path {
            ExecutionPath::Snippet => FallbackPath::Snippet,
            ExecutionPath::Reasoning => FallbackPath::Reasoning,
        }
    }
}
