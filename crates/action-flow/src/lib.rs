//! Step orchestration for adaptive replay.
//!
//! [`ExecutionOrchestrator`] walks an intent spec in order, hands each step
//! to the [`FallbackExecutor`], and, when a step still fails, lets the
//! [`RecoveryEngine`] analyse it and try stored solutions, AI alternatives
//! or an adaptively chosen path.

pub mod errors;
pub mod executor;
pub mod fallback;
pub mod recovery;
pub mod types;

pub use errors::FlowError;
pub use executor::{ExecutionOrchestrator, OrchestratorBuilder};
pub use fallback::FallbackExecutor;
pub use recovery::{suggestion_for, RecoveryEngine};
pub use types::{
    PathTimeouts, RecoveryOptions, RecoveryResult, StepOutcome, StepScope, ADAPTIVE_PATH_MARKER,
    AI_ALTERNATIVE_MARKER,
};
