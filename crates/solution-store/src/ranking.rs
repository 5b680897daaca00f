use chrono::{DateTime, Utc};

use crate::model::{MatchStage, RankedSolution, Solution, SolutionStoreConfig};

const CONFIDENCE_WEIGHT: f64 = 0.4;
const SUCCESS_RATE_WEIGHT: f64 = 0.4;
const FRESHNESS_WEIGHT: f64 = 0.2;
const FRESHNESS_HALF_LIFE_DAYS: f64 = 30.0;
const VOLUME_SATURATION: f64 = 20.0;
const UNTESTED_USES: u64 = 3;

pub(crate) fn rank(
    solution: Solution,
    stage: MatchStage,
    relevance: f64,
    config: &SolutionStoreConfig,
    now: DateTime<Utc>,
) -> RankedSolution {
    let score = relevance
        * (CONFIDENCE_WEIGHT * solution.confidence
            + SUCCESS_RATE_WEIGHT * solution.actual_success_rate
            + FRESHNESS_WEIGHT * freshness_and_volume(&solution, now));
    RankedSolution {
        estimated_duration_ms: estimated_duration_ms(&solution, config),
        risk_note: risk_note(&solution),
        solution,
        stage,
        relevance,
        score,
    }
}

/// Half recency, half usage volume, both in `[0, 1]`.
fn freshness_and_volume(solution: &Solution, now: DateTime<Utc>) -> f64 {
    let usage = &solution.usage_statistics;
    let freshness = match usage.last_used {
        Some(last_used) => {
            let days = (now - last_used).num_seconds().max(0) as f64 / 86_400.0;
            1.0 / (1.0 + days / FRESHNESS_HALF_LIFE_DAYS)
        }
        None => 0.5,
    };
    let volume = (usage.total_uses as f64 / VOLUME_SATURATION).min(1.0);
    0.5 * freshness + 0.5 * volume
}

fn estimated_duration_ms(solution: &Solution, config: &SolutionStoreConfig) -> u64 {
    let usage = &solution.usage_statistics;
    if usage.total_uses == 0 || usage.avg_duration_ms <= 0.0 {
        config.default_estimate_ms
    } else {
        usage.avg_duration_ms.round() as u64
    }
}

fn risk_note(solution: &Solution) -> String {
    let usage = &solution.usage_statistics;
    if usage.total_uses < UNTESTED_USES {
        return format!("untested: {} recorded use(s)", usage.total_uses);
    }
    let rate = solution.actual_success_rate;
    let level = if rate >= 0.8 {
        "low risk"
    } else if rate >= 0.5 {
        "moderate risk"
    } else {
        "high risk"
    };
    format!(
        "{level}: {:.0}% success over {} uses",
        rate * 100.0,
        usage.total_uses
    )
}
