//! @ai:module:intent Summary statistics over trial durations
//! @ai:module:layer domain
//! @ai:module:public_api Summary, median, std_dev
//! @ai:module:stateless true
//!
//! The median is the headline value because it resists one-off scheduling
//! hiccups. Order statistics are computed on integer nanoseconds so a median
//! of observed values is exactly one of them (or the midpoint of two).

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// @ai:intent Statistics of a non-empty set of durations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub median: Duration,
    pub mean: Duration,
    /// Sample standard deviation; zero with fewer than two samples
    pub std_dev: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl Summary {
    /// @ai:intent Summarize samples, None when there are none
    /// @ai:effects pure
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let total: u128 = sorted.iter().map(Duration::as_nanos).sum();

        Some(Self {
            count: sorted.len(),
            median: median_of_sorted(&sorted)?,
            mean: from_nanos(total / sorted.len() as u128),
            std_dev: std_dev(&sorted),
            min,
            max,
        })
    }
}

/// @ai:intent Median; mean of the two middle values for an even count
/// @ai:effects pure
pub fn median(samples: &[Duration]) -> Option<Duration> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    median_of_sorted(&sorted)
}

fn median_of_sorted(sorted: &[Duration]) -> Option<Duration> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        let lower = sorted[n / 2 - 1].as_nanos();
        let upper = sorted[n / 2].as_nanos();
        Some(from_nanos((lower + upper) / 2))
    }
}

/// @ai:intent Sample (n - 1) standard deviation, zero below two samples
/// @ai:effects pure
pub fn std_dev(samples: &[Duration]) -> Duration {
    if samples.len() < 2 {
        return Duration::ZERO;
    }

    let values: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    Duration::try_from_secs_f64(variance.sqrt()).unwrap_or(Duration::ZERO)
}

fn from_nanos(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    // Remainder is always below one second
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, subsec)
}
