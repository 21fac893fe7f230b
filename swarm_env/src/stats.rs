//! Summary statistics for Monte Carlo aggregation.
//!
//! All dispersion figures are *population* statistics: a sweep of `R` runs is
//! treated as the whole population of interest, so `R = 1` yields a standard
//! deviation of exactly zero.

use crate::EnvError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population variance. Zero for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_variance()
}

/// Population standard deviation. Zero for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Smallest value, `f64::INFINITY` for an empty slice.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Largest value, `f64::NEG_INFINITY` for an empty slice.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Nearest-rank-below percentile, `p` in `[0, 100]`.
///
/// Picks `sorted[floor(p / 100 * (n - 1))]` with no interpolation. Zero for an
/// empty slice.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    let rank = (p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// All common statistics of one metric at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentile5: f64,
    pub percentile95: f64,
}

impl Summary {
    /// Computes the summary. All fields are zero for an empty slice.
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sorted = sorted_copy(values);
        let n = sorted.len();
        let at = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];

        Self {
            mean: mean(values),
            std_dev: std_dev(values),
            min: sorted[0],
            max: sorted[n - 1],
            percentile5: at(0.05),
            percentile95: at(0.95),
        }
    }
}

/// Two-sided confidence interval for a mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

/// Normal-approximation confidence interval for the mean of `values`.
///
/// Uses `mean ± z * σ / sqrt(n)` with `z` the standard normal quantile at
/// `1 - (1 - level) / 2` (1.96 at 95%). An empty slice yields a zero-width
/// interval at zero.
pub fn confidence_interval(values: &[f64], level: f64) -> Result<ConfidenceInterval, EnvError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(EnvError::InvalidConfidenceLevel(level));
    }
    if values.is_empty() {
        return Ok(ConfidenceInterval {
            mean: 0.0,
            lower: 0.0,
            upper: 0.0,
            confidence_level: level,
        });
    }

    let standard = Normal::new(0.0, 1.0).map_err(EnvError::distribution)?;
    let z = standard.inverse_cdf(1.0 - (1.0 - level) / 2.0);

    let m = mean(values);
    let margin = z * std_dev(values) / (values.len() as f64).sqrt();

    Ok(ConfidenceInterval {
        mean: m,
        lower: m - margin,
        upper: m + margin,
        confidence_level: level,
    })
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
