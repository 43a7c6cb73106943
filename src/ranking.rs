//! @ai:module:intent Order toolchains by representative duration for each test case
//! @ai:module:layer domain
//! @ai:module:public_api rank, rank_by_test, compare, RankedResult, TestRanking
//! @ai:module:stateless true

use crate::aggregator::{duration_ms, AggregatedResult, PairOutcome};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

/// @ai:intent One toolchain's place in a test's ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based rank; None for pairs that could not be benchmarked
    pub position: Option<usize>,
    pub toolchain: String,
    #[serde(with = "duration_ms::option")]
    pub representative_duration: Option<Duration>,
    #[serde(with = "duration_ms")]
    pub dispersion: Duration,
    /// Representative duration divided by the fastest one
    pub relative_to_fastest: Option<f64>,
    pub outcome: PairOutcome,
}

/// @ai:intent Ranking of every toolchain for a single test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRanking {
    pub test_identifier: String,
    pub entries: Vec<RankedResult>,
}

/// @ai:intent Total order: faster first, then lower dispersion, then toolchain id.
///            Pairs without a representative duration always sort last.
/// @ai:effects pure
pub fn compare(a: &AggregatedResult, b: &AggregatedResult) -> Ordering {
    match (a.representative_duration, b.representative_duration) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then(a.dispersion.cmp(&b.dispersion))
            .then_with(|| a.toolchain.cmp(&b.toolchain)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.toolchain.cmp(&b.toolchain),
    }
}

/// @ai:intent Rank the results of one test case
/// @ai:effects pure
pub fn rank(results: &[AggregatedResult]) -> Vec<RankedResult> {
    let mut sorted: Vec<&AggregatedResult> = results.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));

    let fastest = sorted
        .first()
        .and_then(|r| r.representative_duration)
        .filter(|d| !d.is_zero());

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            let measured = result.representative_duration.is_some();

            RankedResult {
                position: measured.then_some(index + 1),
                toolchain: result.toolchain.clone(),
                representative_duration: result.representative_duration,
                dispersion: result.dispersion,
                relative_to_fastest: result
                    .representative_duration
                    .zip(fastest)
                    .map(|(d, f)| d.as_nanos() as f64 / f.as_nanos() as f64),
                outcome: result.outcome(),
            }
        })
        .collect()
}

/// @ai:intent Group results by test case and rank each group, tests in sorted order
/// @ai:effects pure
pub fn rank_by_test(results: &[AggregatedResult]) -> Vec<TestRanking> {
    let mut groups: BTreeMap<&str, Vec<AggregatedResult>> = BTreeMap::new();

    for result in results {
        groups
            .entry(result.test_identifier.as_str())
            .or_default()
            .push(result.clone());
    }

    groups
        .into_iter()
        .map(|(test, group)| TestRanking {
            test_identifier: test.to_string(),
            entries: rank(&group),
        })
        .collect()
}
