use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Selector,
    Network,
    Timeout,
    Validation,
    Permission,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Selector => "selector",
            ErrorType::Network => "network",
            ErrorType::Timeout => "timeout",
            ErrorType::Validation => "validation",
            ErrorType::Permission => "permission",
            ErrorType::Unknown => "unknown",
        }
    }

    pub fn all() -> [ErrorType; 6] {
        [
            ErrorType::Selector,
            ErrorType::Network,
            ErrorType::Timeout,
            ErrorType::Validation,
            ErrorType::Permission,
            ErrorType::Unknown,
        ]
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
