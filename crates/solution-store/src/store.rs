use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::SolutionStoreError;
use crate::model::{
    ErrorContext, MatchStage, RankedSolution, Solution, SolutionCandidate, SolutionLookup,
    SolutionStoreConfig, Urgency,
};
use crate::ranking::rank;
use crate::signature::{normalize_error, similarity, tokens};
use crate::snapshot::{
    ImportSummary, SnapshotMetadata, SolutionSnapshot, SolutionStatistics, SNAPSHOT_VERSION,
};

const SNAPSHOT_SOURCE: &str = "soulbrowser-replay";

#[derive(Default)]
struct StoreMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
}

/// Result of [`SolutionStore::record_outcome`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutcomeReport {
    pub solution: Solution,
    pub deprecated_now: bool,
    /// Enough consecutive failures to replace the solution through
    /// [`SolutionStore::evolve_solution`] once a working alternative exists.
    pub evolution_due: bool,
}

/// Solutions keyed by id.
///
/// Outcome recording goes through the map's per-entry write guard, so
/// concurrent updates of one solution are applied one after another.
#[derive(Default)]
pub struct SolutionStore {
    solutions: DashMap<String, Solution>,
    storage_path: Option<PathBuf>,
    config: SolutionStoreConfig,
    metrics: StoreMetrics,
}

pub type SharedSolutionStore = Arc<SolutionStore>;

impl SolutionStore {
    pub fn new(config: SolutionStoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Store backed by a JSON file, loading it when present.
    pub fn with_persistence(
        path: impl Into<PathBuf>,
        config: SolutionStoreConfig,
    ) -> Result<Self, SolutionStoreError> {
        let path = path.into();
        let store = Self {
            storage_path: Some(path.clone()),
            ..Self::new(config)
        };
        if path.exists() {
            let bytes = fs::read(&path)?;
            if !bytes.is_empty() {
                let solutions: Vec<Solution> = serde_json::from_slice(&bytes)?;
                for solution in solutions {
                    store.solutions.insert(solution.id.clone(), solution);
                }
            }
            debug!(path = %path.display(), count = store.len(), "solution store loaded");
        }
        Ok(store)
    }

    pub fn config(&self) -> &SolutionStoreConfig {
        &self.config
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Solution> {
        self.solutions.get(id).map(|entry| entry.value().clone())
    }

    /// All solutions, newest first.
    pub fn list(&self) -> Vec<Solution> {
        let mut all: Vec<Solution> = self
            .solutions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Staged lookup: exact signature, then fuzzy, then category.
    ///
    /// The first stage that yields candidates ends the search. Later stages
    /// are skipped once `time_budget` is spent, and solutions expected to run
    /// longer than the budget are left out.
    pub fn find_solutions(
        &self,
        context: &ErrorContext,
        urgency: Urgency,
        time_budget: Duration,
    ) -> SolutionLookup {
        let started = Instant::now();
        let signature = context.signature();
        let active: Vec<Solution> = self
            .solutions
            .iter()
            .filter(|entry| !entry.value().deprecated)
            .map(|entry| entry.value().clone())
            .collect();

        let mut matches: Vec<(Solution, MatchStage, f64)> = active
            .iter()
            .filter(|solution| solution.error_signature == signature)
            .map(|solution| (solution.clone(), MatchStage::Exact, 1.0))
            .collect();

        if matches.is_empty() && started.elapsed() < time_budget {
            let query = tokens(&normalize_error(&context.message), &context.tags);
            matches = active
                .iter()
                .filter_map(|solution| {
                    let candidate = tokens(&solution.error_pattern, &solution.tags);
                    let score = similarity(&query, &candidate);
                    (score >= self.config.fuzzy_threshold)
                        .then(|| (solution.clone(), MatchStage::Fuzzy, score))
                })
                .collect();
        }

        if matches.is_empty() && started.elapsed() < time_budget {
            matches = active
                .iter()
                .filter(|solution| solution.category == context.error_type)
                .map(|solution| {
                    (
                        solution.clone(),
                        MatchStage::Category,
                        self.config.category_relevance,
                    )
                })
                .collect();
        }

        let now = Utc::now();
        let budget_ms = time_budget.as_millis() as u64;
        let mut ranked: Vec<RankedSolution> = matches
            .into_iter()
            .map(|(solution, stage, relevance)| rank(solution, stage, relevance, &self.config, now))
            .filter(|ranked| ranked.estimated_duration_ms <= budget_ms)
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.solution.id.cmp(&b.solution.id))
        });
        ranked.truncate(self.config.max_results);

        let relevant = ranked
            .iter()
            .any(|candidate| candidate.relevance >= self.config.min_relevance);
        let confident = ranked.iter().any(|candidate| {
            candidate.relevance * candidate.solution.confidence >= self.config.high_confidence
        });
        let fallback_required = !relevant || (urgency == Urgency::Critical && !confident);

        self.metrics.lookups.fetch_add(1, Ordering::Relaxed);
        if relevant {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            signature = %signature,
            urgency = ?urgency,
            results = ranked.len(),
            fallback_required,
            "solution lookup finished"
        );
        SolutionLookup {
            solutions: ranked,
            fallback_required,
        }
    }

    /// Fold one use of `id` into its statistics.
    pub fn record_outcome(
        &self,
        id: &str,
        success: bool,
        duration_ms: u64,
    ) -> Result<OutcomeReport, SolutionStoreError> {
        let (solution, deprecated_now, evolution_due) = {
            let mut entry = self
                .solutions
                .get_mut(id)
                .ok_or_else(|| SolutionStoreError::UnknownSolution(id.to_string()))?;
            let solution = entry.value_mut();
            let now = Utc::now();
            let usage = &mut solution.usage_statistics;
            usage.total_uses += 1;
            if success {
                usage.success_count += 1;
                usage.consecutive_failures = 0;
            } else {
                usage.failure_count += 1;
                usage.consecutive_failures += 1;
            }
            usage.first_used.get_or_insert(now);
            usage.last_used = Some(now);
            let n = usage.total_uses as f64;
            usage.avg_duration_ms += (duration_ms as f64 - usage.avg_duration_ms) / n;

            let weight = (1.0 / n).max(self.config.min_learning_rate);
            let observed = if success { 1.0 } else { 0.0 };
            solution.actual_success_rate += weight * (observed - solution.actual_success_rate);

            let deprecated_now = !solution.deprecated
                && solution.usage_statistics.total_uses >= self.config.deprecation_min_uses
                && solution.actual_success_rate < self.config.deprecation_threshold;
            if deprecated_now {
                solution.deprecated = true;
            }
            let evolution_due = !solution.deprecated
                && solution.evolved_into.is_none()
                && solution.usage_statistics.consecutive_failures
                    >= self.config.evolve_after_failures;
            (solution.clone(), deprecated_now, evolution_due)
        };

        if deprecated_now {
            info!(
                solution = %id,
                success_rate = solution.actual_success_rate,
                uses = solution.usage_statistics.total_uses,
                "solution deprecated"
            );
        }

        self.persist_logged("record_outcome");
        Ok(OutcomeReport {
            solution,
            deprecated_now,
            evolution_due,
        })
    }

    /// Replace a repeatedly failing solution with new code.
    ///
    /// The parent is kept but linked to its successor and down-ranked. A
    /// parent can be evolved once, and only into different code.
    pub fn evolve_solution(
        &self,
        parent_id: &str,
        candidate: SolutionCandidate,
        context: &ErrorContext,
    ) -> Result<Solution, SolutionStoreError> {
        validate_candidate(&candidate)?;
        let child = {
            let mut entry = self
                .solutions
                .get_mut(parent_id)
                .ok_or_else(|| SolutionStoreError::UnknownSolution(parent_id.to_string()))?;
            let parent = entry.value_mut();
            if let Some(successor) = parent.evolved_into.as_ref() {
                return Err(SolutionStoreError::AlreadyEvolved {
                    id: parent_id.to_string(),
                    successor: successor.clone(),
                });
            }
            if parent.code.trim() == candidate.code.trim() {
                return Err(SolutionStoreError::InvalidCandidate(
                    "code is identical to the solution it replaces".to_string(),
                ));
            }
            let child = Solution::derived(parent, candidate, context);
            parent.evolved_into = Some(child.id.clone());
            parent.confidence /= 2.0;
            child
        };
        self.solutions.insert(child.id.clone(), child.clone());
        info!(
            parent = %parent_id,
            child = %child.id,
            generation = child.generation,
            "solution evolved after repeated failures"
        );
        self.persist_logged("evolve_solution");
        Ok(child)
    }

    /// Store a remediation that just worked.
    ///
    /// An active solution with the same signature and code is returned
    /// instead of creating a duplicate.
    pub fn store_new_solution(
        &self,
        candidate: SolutionCandidate,
        context: &ErrorContext,
    ) -> Result<Solution, SolutionStoreError> {
        validate_candidate(&candidate)?;
        let signature = context.signature();
        let existing = self.solutions.iter().find_map(|entry| {
            let solution = entry.value();
            (!solution.deprecated
                && solution.error_signature == signature
                && solution.code.trim() == candidate.code.trim())
            .then(|| solution.clone())
        });
        if let Some(existing) = existing {
            debug!(solution = %existing.id, "candidate matches an existing solution");
            return Ok(existing);
        }

        let solution = Solution::from_candidate(candidate, context);
        self.solutions.insert(solution.id.clone(), solution.clone());
        info!(
            solution = %solution.id,
            signature = %solution.error_signature,
            category = %solution.category,
            "new solution stored"
        );
        self.persist_logged("store_new_solution");
        Ok(solution)
    }

    pub fn statistics(&self) -> SolutionStatistics {
        let mut stats = SolutionStatistics::default();
        for entry in self.solutions.iter() {
            let solution = entry.value();
            stats.total_solutions += 1;
            if solution.deprecated {
                stats.deprecated_solutions += 1;
            } else {
                stats.active_solutions += 1;
            }
            stats.total_uses += solution.usage_statistics.total_uses;
            stats.total_successes += solution.usage_statistics.success_count;
            *stats.by_category.entry(solution.category).or_insert(0) += 1;
        }
        stats.overall_success_rate = ratio(stats.total_successes, stats.total_uses);
        stats.lookups = self.metrics.lookups.load(Ordering::Relaxed);
        stats.lookup_hits = self.metrics.hits.load(Ordering::Relaxed);
        stats.hit_rate = ratio(stats.lookup_hits, stats.lookups);
        stats
    }

    pub fn export_snapshot(&self) -> SolutionSnapshot {
        let statistics = self.statistics();
        SolutionSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            exported_at: Utc::now(),
            metadata: SnapshotMetadata {
                source: SNAPSHOT_SOURCE.to_string(),
                solution_count: statistics.total_solutions,
                deprecated_count: statistics.deprecated_solutions,
            },
            statistics,
            solutions: self.list(),
        }
    }

    /// Merge a snapshot; ids already present are kept as they are.
    pub fn import_snapshot(
        &self,
        snapshot: SolutionSnapshot,
    ) -> Result<ImportSummary, SolutionStoreError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SolutionStoreError::UnsupportedVersion(snapshot.version));
        }
        let mut summary = ImportSummary::default();
        for solution in snapshot.solutions {
            if self.solutions.contains_key(&solution.id) {
                summary.skipped += 1;
                continue;
            }
            self.solutions.insert(solution.id.clone(), solution);
            summary.imported += 1;
        }
        if summary.imported > 0 {
            self.persist_logged("import_snapshot");
        }
        info!(
            source = %snapshot.metadata.source,
            imported = summary.imported,
            skipped = summary.skipped,
            "solution snapshot imported"
        );
        Ok(summary)
    }

    pub fn persist_now(&self) -> Result<(), SolutionStoreError> {
        self.persist_to_disk()
    }

    fn persist_logged(&self, operation: &'static str) {
        if let Err(err) = self.persist_to_disk() {
            warn!(operation, error = %err, "solution store persist failed");
        }
    }

    fn persist_to_disk(&self) -> Result<(), SolutionStoreError> {
        let Some(path) = self.storage_path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.list())?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn validate_candidate(candidate: &SolutionCandidate) -> Result<(), SolutionStoreError> {
    if candidate.code.trim().is_empty() {
        return Err(SolutionStoreError::InvalidCandidate(
            "code must not be empty".to_string(),
        ));
    }
    if !candidate.confidence.is_finite() {
        return Err(SolutionStoreError::InvalidCandidate(
            "confidence must be a finite number".to_string(),
        ));
    }
    Ok(())
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use self_heal::ErrorType;

    fn context(message: &str) -> ErrorContext {
        ErrorContext::new(message, ErrorType::Selector)
    }

    #[test]
    fn incremental_average_and_duration() {
        let store = SolutionStore::default();
        let solution = store
            .store_new_solution(SolutionCandidate::new("click()", "alt", 0.9), &context("element not found"))
            .unwrap();
        let first = store.record_outcome(&solution.id, true, 100).unwrap();
        assert!((first.solution.actual_success_rate - 1.0).abs() < 1e-9);
        let second = store.record_outcome(&solution.id, false, 300).unwrap();
        assert!((second.solution.actual_success_rate - 0.5).abs() < 1e-9);
        assert!((second.solution.usage_statistics.avg_duration_ms - 200.0).abs() < 1e-9);
        assert_eq!(second.solution.usage_statistics.failure_count, 1);
        assert!(second.solution.usage_statistics.first_used.is_some());
    }

    #[test]
    fn failing_best_solution_is_deprecated_with_default_config() {
        let store = SolutionStore::default();
        let error = context("element not found");
        store
            .store_new_solution(SolutionCandidate::new("broken()", "alt", 0.9), &error)
            .unwrap();

        let mut rounds = 0;
        loop {
            let lookup = store.find_solutions(&error, Urgency::Normal, Duration::from_secs(5));
            let Some(best) = lookup.best() else {
                assert!(lookup.fallback_required);
                break;
            };
            rounds += 1;
            assert!(rounds <= 30, "solution is still offered after {rounds} failures");
            let report = store.record_outcome(&best.solution.id, false, 10).unwrap();
            assert_eq!(report.evolution_due, (3..5).contains(&rounds), "round {rounds}");
        }

        assert_eq!(rounds, 5);
        assert_eq!(store.len(), 1);
        let only = store.list().remove(0);
        assert!(only.deprecated);
        assert_eq!(only.usage_statistics.failure_count, 5);
    }

    #[test]
    fn evolution_links_a_new_successor() {
        let store = SolutionStore::default();
        let error = context("element not found");
        let solution = store
            .store_new_solution(SolutionCandidate::new("click()", "alt", 0.8), &error)
            .unwrap();
        store.record_outcome(&solution.id, true, 10).unwrap();
        store.record_outcome(&solution.id, false, 10).unwrap();
        assert!(!store.record_outcome(&solution.id, false, 10).unwrap().evolution_due);
        assert!(store.record_outcome(&solution.id, false, 10).unwrap().evolution_due);

        assert!(matches!(
            store.evolve_solution(&solution.id, SolutionCandidate::new(" click() ", "alt", 0.9), &error),
            Err(SolutionStoreError::InvalidCandidate(_))
        ));

        let child = store
            .evolve_solution(&solution.id, SolutionCandidate::new("click('text=Buy')", "ai_alternative", 0.9), &error)
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(solution.id.as_str()));
        assert_eq!(child.generation, 1);
        assert_eq!(child.code, "click('text=Buy')");
        assert_eq!(child.usage_statistics.total_uses, 0);
        assert!(child.tags.iter().any(|tag| tag == "evolved"));

        let parent = store.get(&solution.id).unwrap();
        assert_eq!(parent.evolved_into.as_deref(), Some(child.id.as_str()));
        assert!((parent.confidence - 0.4).abs() < 1e-9);
        assert!(!parent.deprecated);
        assert_eq!(store.len(), 2);

        assert!(matches!(
            store.evolve_solution(&solution.id, SolutionCandidate::new("press()", "alt", 0.9), &error),
            Err(SolutionStoreError::AlreadyEvolved { .. })
        ));
        assert!(!store.record_outcome(&solution.id, false, 10).unwrap().evolution_due);

        let lookup = store.find_solutions(&error, Urgency::Normal, Duration::from_secs(5));
        assert_eq!(lookup.best().unwrap().solution.id, child.id);
    }

    #[test]
    fn concurrent_evolution_claims_the_parent_once() {
        let store = Arc::new(SolutionStore::default());
        let error = context("element not found");
        let parent = store
            .store_new_solution(SolutionCandidate::new("click()", "alt", 0.8), &error)
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let store = store.clone();
                let error = error.clone();
                let parent_id = parent.id.clone();
                std::thread::spawn(move || {
                    store
                        .evolve_solution(
                            &parent_id,
                            SolutionCandidate::new(format!("click('#alt-{idx}')"), "alt", 0.7),
                            &error,
                        )
                        .is_ok()
                })
            })
            .collect();
        let evolved = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(evolved, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unknown_id_is_an_error() {
        let store = SolutionStore::default();
        assert!(matches!(
            store.record_outcome("missing", true, 1),
            Err(SolutionStoreError::UnknownSolution(_))
        ));
    }

    #[test]
    fn duplicate_candidates_are_merged() {
        let store = SolutionStore::default();
        let a = store
            .store_new_solution(SolutionCandidate::new("click()", "alt", 0.8), &context("element '#a' not found"))
            .unwrap();
        let b = store
            .store_new_solution(SolutionCandidate::new(" click() ", "alt", 0.6), &context("element '#b' not found"))
            .unwrap();
        assert_eq!(a.id, b.id);
        assert!(store
            .store_new_solution(SolutionCandidate::new("  ", "alt", 0.6), &context("x"))
            .is_err());
    }
}
