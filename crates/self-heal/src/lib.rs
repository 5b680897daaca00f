//! Failure analysis for replayed steps.
//!
//! A failed step goes through three stages here: the classifier tags the
//! error with a taxonomy type, severity and recoverability verdict; the
//! recovery planner turns that verdict into ranked remediation actions
//! (optionally asking the judgment service for alternative code); and the
//! bounded error history remembers what failed recently.

pub mod analyzer;
pub mod classifier;
pub mod history;
pub mod recovery;
pub mod taxonomy;

pub use analyzer::{ErrorAnalysis, ErrorAnalyzer};
pub use classifier::{classify, Classification, ClassificationRule, ErrorClassifier};
pub use history::{ErrorHistory, ErrorRecord};
pub use recovery::{AlternativeApproach, RecoveryAction, RecoveryActionKind, RecoveryPlanner};
pub use taxonomy::{ErrorType, Severity};
