//! @ai:module:intent Repeat trials per (toolchain, test) pair and reduce them to statistics
//! @ai:module:layer application
//! @ai:module:public_api StatisticalAggregator, AggregatedResult, PairOutcome
//! @ai:module:stateless false

use crate::error::Result;
use crate::invoker::ProcessInvokerTrait;
use crate::runner::{BenchmarkRunner, TrialResult, TrialStatus};
use crate::stats::Summary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// @ai:intent Terminal state of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairOutcome {
    /// At least one trial succeeded
    Measured,
    /// The toolchain ran but never produced a successful build
    AllTrialsFailed,
    /// The toolchain was not installed; nothing was attempted
    Unavailable,
}

/// @ai:intent Statistics for one (toolchain, test) pair.
///            Without a successful trial there is no representative duration,
///            never a zero standing in for one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub toolchain: String,
    pub test_identifier: String,
    pub available: bool,
    /// Median of successful trial durations
    #[serde(with = "duration_ms::option")]
    pub representative_duration: Option<Duration>,
    /// Sample standard deviation of successful durations
    #[serde(with = "duration_ms")]
    pub dispersion: Duration,
    #[serde(with = "duration_ms::option")]
    pub mean_duration: Option<Duration>,
    #[serde(with = "duration_ms::option")]
    pub min_duration: Option<Duration>,
    #[serde(with = "duration_ms::option")]
    pub max_duration: Option<Duration>,
    pub successful_trials: u32,
    /// Trials that actually ran; synthesized unavailable trials are excluded
    pub attempted_trials: u32,
    pub timed_out_trials: u32,
    /// Artifact size from the last successful trial
    pub artifact_size: Option<u64>,
}

impl AggregatedResult {
    /// @ai:intent Reduce a pair's trials to statistics
    /// @ai:effects pure
    pub fn from_trials(toolchain: &str, test: &str, available: bool, trials: &[TrialResult]) -> Self {
        let attempted: Vec<&TrialResult> = trials
            .iter()
            .filter(|t| t.status != TrialStatus::Unavailable)
            .collect();

        let durations: Vec<Duration> = attempted
            .iter()
            .filter(|t| t.success)
            .map(|t| t.duration)
            .collect();
        let summary = Summary::from_samples(&durations);

        Self {
            toolchain: toolchain.to_string(),
            test_identifier: test.to_string(),
            available,
            representative_duration: summary.map(|s| s.median),
            dispersion: summary.map(|s| s.std_dev).unwrap_or(Duration::ZERO),
            mean_duration: summary.map(|s| s.mean),
            min_duration: summary.map(|s| s.min),
            max_duration: summary.map(|s| s.max),
            successful_trials: durations.len() as u32,
            attempted_trials: attempted.len() as u32,
            timed_out_trials: attempted
                .iter()
                .filter(|t| t.status == TrialStatus::TimedOut)
                .count() as u32,
            artifact_size: attempted
                .iter()
                .rev()
                .filter(|t| t.success)
                .find_map(|t| t.artifact_size),
        }
    }

    /// @ai:effects pure
    pub fn outcome(&self) -> PairOutcome {
        if !self.available {
            PairOutcome::Unavailable
        } else if self.successful_trials == 0 {
            PairOutcome::AllTrialsFailed
        } else {
            PairOutcome::Measured
        }
    }

    /// @ai:intent Percentage of attempted trials that failed, None if none ran
    /// @ai:effects pure
    pub fn failure_rate(&self) -> Option<f64> {
        if self.attempted_trials == 0 {
            return None;
        }

        let failed = self.attempted_trials - self.successful_trials;
        Some(failed as f64 / self.attempted_trials as f64 * 100.0)
    }
}

/// @ai:intent Drives repeated trials through a shared runner
pub struct StatisticalAggregator<I: ProcessInvokerTrait> {
    runner: Arc<BenchmarkRunner<I>>,
}

impl<I: ProcessInvokerTrait + 'static> StatisticalAggregator<I> {
    /// @ai:effects pure
    pub fn new(runner: Arc<BenchmarkRunner<I>>) -> Self {
        Self { runner }
    }

    /// @ai:intent Run `iterations` sequential trials for one pair and summarize them
    /// @ai:effects io, fs:write
    pub async fn aggregate(&self, toolchain: &str, test: &str, iterations: u32) -> Result<AggregatedResult> {
        aggregate_pair(&self.runner, toolchain, test, iterations).await
    }

    /// @ai:intent Aggregate many pairs, at most `concurrency` at a time.
    ///            Trials within a pair always run sequentially. Output order matches `pairs`.
    /// @ai:effects io, fs:write
    pub async fn aggregate_all(
        &self,
        pairs: &[(String, String)],
        iterations: u32,
        concurrency: usize,
    ) -> Result<Vec<AggregatedResult>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(pairs.len());

        for (toolchain, test) in pairs.iter().cloned() {
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                aggregate_pair(&runner, &toolchain, &test, iterations).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut handles = handles.into_iter();

        while let Some(handle) = handles.next() {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    handles.by_ref().for_each(|h| h.abort());
                    return Err(e);
                }
                Err(e) => {
                    handles.by_ref().for_each(|h| h.abort());
                    return Err(e.into());
                }
            }
        }

        Ok(results)
    }
}

/// @ai:intent Sequential trials for one pair
/// @ai:effects io, fs:write
async fn aggregate_pair<I: ProcessInvokerTrait>(
    runner: &BenchmarkRunner<I>,
    toolchain: &str,
    test: &str,
    iterations: u32,
) -> Result<AggregatedResult> {
    let available = runner.is_available(toolchain);
    if available {
        tracing::info!("Benchmarking {}/{} ({} iterations)", toolchain, test, iterations);
    }

    let mut trials = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        trials.push(runner.run_once(toolchain, test).await?);
    }

    let result = AggregatedResult::from_trials(toolchain, test, available, &trials);

    match result.representative_duration {
        Some(median) => tracing::info!(
            "{}/{}: median {:?} over {}/{} successful trials",
            toolchain,
            test,
            median,
            result.successful_trials,
            result.attempted_trials
        ),
        None if available => tracing::warn!("{}/{}: all {} trials failed", toolchain, test, result.attempted_trials),
        None => {}
    }

    Ok(result)
}

/// Durations as fractional milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    const NANOS_PER_MILLI: f64 = 1_000_000.0;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_nanos() as f64 / NANOS_PER_MILLI)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        from_millis(f64::deserialize(deserializer)?)
    }

    fn from_millis<E: serde::de::Error>(millis: f64) -> Result<Duration, E> {
        if !millis.is_finite() || millis < 0.0 {
            return Err(E::custom(format!("invalid duration: {millis} ms")));
        }
        Ok(Duration::from_nanos((millis * NANOS_PER_MILLI).round() as u64))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            Option::<f64>::deserialize(deserializer)?
                .map(super::from_millis)
                .transpose()
        }
    }
}
