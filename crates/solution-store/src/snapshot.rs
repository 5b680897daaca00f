use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use self_heal::ErrorType;
use serde::{Deserialize, Serialize};

use crate::model::Solution;

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionStatistics {
    pub total_solutions: u64,
    pub active_solutions: u64,
    pub deprecated_solutions: u64,
    pub total_uses: u64,
    pub total_successes: u64,
    pub overall_success_rate: f64,
    pub lookups: u64,
    pub lookup_hits: u64,
    pub hit_rate: f64,
    #[serde(default)]
    pub by_category: BTreeMap<ErrorType, u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub source: String,
    pub solution_count: u64,
    pub deprecated_count: u64,
}

/// Versioned bundle for moving solutions between store instances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub metadata: SnapshotMetadata,
    pub statistics: SolutionStatistics,
    pub solutions: Vec<Solution>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}
