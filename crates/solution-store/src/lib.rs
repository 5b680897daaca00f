//! Solution store
//!
//! One-off fixes that worked once become [`Solution`]s keyed by a
//! normalized error signature. Lookups walk exact, fuzzy and category
//! stages; every use feeds back into the solution's success statistics so
//! reliable fixes rise and failing ones are deprecated or evolved.

mod errors;
mod model;
mod ranking;
mod signature;
mod snapshot;
mod store;

pub use errors::SolutionStoreError;
pub use model::{
    ErrorContext, MatchStage, RankedSolution, Solution, SolutionCandidate, SolutionLookup,
    SolutionStoreConfig, Urgency, UsageStatistics,
};
pub use signature::{error_signature, normalize_error, similarity};
pub use snapshot::{ImportSummary, SnapshotMetadata, SolutionSnapshot, SolutionStatistics, SNAPSHOT_VERSION};
pub use store::{OutcomeReport, SharedSolutionStore, SolutionStore};
