//! Error classification
//!
//! Matching is case-insensitive substring search over the error message,
//! walking [`DEFAULT_RULES`] in order; the first rule with a matching
//! phrase wins.

use serde::Serialize;

use crate::taxonomy::{ErrorType, Severity};

/// One row of the classification table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassificationRule {
    pub error_type: ErrorType,
    pub phrases: &'static [&'static str],
    pub root_cause: &'static str,
}

pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        error_type: ErrorType::Selector,
        phrases: &[
            "element not found",
            "no element",
            "no such element",
            "selector",
            "unable to locate",
            "could not find element",
            "failed to find element",
            "not attached to the dom",
            "element is not visible",
            "anchor not found",
        ],
        root_cause: "target element could not be located with the recorded selector",
    },
    ClassificationRule {
        error_type: ErrorType::Network,
        phrases: &[
            "network",
            "fetch",
            "net::",
            "connection refused",
            "connection reset",
            "econnrefused",
            "econnreset",
            "dns",
            "socket hang up",
            "offline",
        ],
        root_cause: "page or resource request failed at the network layer",
    },
    ClassificationRule {
        error_type: ErrorType::Timeout,
        phrases: &["timeout", "timed out", "deadline exceeded", "took too long"],
        root_cause: "operation did not finish within its time budget",
    },
    ClassificationRule {
        error_type: ErrorType::Validation,
        phrases: &[
            "validation",
            "invalid",
            "assertion",
            "expected",
            "mismatch",
        ],
        root_cause: "page state did not match what the step expected",
    },
    ClassificationRule {
        error_type: ErrorType::Permission,
        phrases: &[
            "permission",
            "denied",
            "unauthorized",
            "forbidden",
            "not allowed",
        ],
        root_cause: "the site or browser refused the action",
    },
];

const UNKNOWN_ROOT_CAUSE: &str = "error did not match any known failure pattern";

/// Step names that mark authentication flows.
const AUTH_STEP_KEYWORDS: &[&str] = &[
    "login",
    "log in",
    "log-in",
    "signin",
    "sign in",
    "sign-in",
    "auth",
    "password",
    "credential",
    "2fa",
    "mfa",
];

const HIGH_SEVERITY_RETRIES: u32 = 3;
const UNRECOVERABLE_RETRIES: u32 = 5;

/// Map an error message to its taxonomy type.
pub fn classify(message: &str) -> ErrorType {
    ErrorClassifier::default().classify(message).0
}

/// Verdict for one failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub error_type: ErrorType,
    pub severity: Severity,
    pub is_recoverable: bool,
    pub root_cause: String,
}

#[derive(Clone, Debug)]
pub struct ErrorClassifier {
    rules: &'static [ClassificationRule],
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES,
        }
    }
}

impl ErrorClassifier {
    pub fn with_rules(rules: &'static [ClassificationRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [ClassificationRule] {
        self.rules
    }

    /// Taxonomy type plus the matching rule's root-cause text.
    pub fn classify(&self, message: &str) -> (ErrorType, &'static str) {
        let lower = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.phrases.iter().any(|phrase| lower.contains(phrase)))
            .map(|rule| (rule.error_type, rule.root_cause))
            .unwrap_or((ErrorType::Unknown, UNKNOWN_ROOT_CAUSE))
    }

    /// Full verdict for a failure of `step_name`.
    pub fn assess(
        &self,
        message: &str,
        step_name: &str,
        continue_on_failure: bool,
        retry_count: u32,
    ) -> Classification {
        let (error_type, root_cause) = self.classify(message);
        let severity = severity_for(error_type, step_name, continue_on_failure, retry_count);
        Classification {
            error_type,
            severity,
            is_recoverable: is_recoverable(error_type, severity, retry_count),
            root_cause: root_cause.to_string(),
        }
    }
}

pub fn is_auth_step(step_name: &str) -> bool {
    let lower = step_name.to_lowercase();
    AUTH_STEP_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn severity_for(
    error_type: ErrorType,
    step_name: &str,
    continue_on_failure: bool,
    retry_count: u32,
) -> Severity {
    if is_auth_step(step_name) {
        Severity::Critical
    } else if error_type == ErrorType::Network || retry_count >= HIGH_SEVERITY_RETRIES {
        Severity::High
    } else if continue_on_failure {
        Severity::Low
    } else {
        Severity::Medium
    }
}

pub fn is_recoverable(error_type: ErrorType, severity: Severity, retry_count: u32) -> bool {
    if severity == Severity::Critical || retry_count >= UNRECOVERABLE_RETRIES {
        return false;
    }
    error_type != ErrorType::Permission
}
