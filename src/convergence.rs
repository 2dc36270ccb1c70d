//! Convergence of a metric across iterations.
//!
//! Two independent measures are offered. [`convergence_trend`] compares the
//! spread of the first half of the series with the spread of the second half;
//! it is what the diagnosis uses. [`ConvergenceSummary`] looks at the spread of
//! the whole series against fixed thresholds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceVerdict {
    Converging,
    ModerateVariance,
    NotConverging,
    /// Too few samples to judge.
    Insufficient,
}

/// Spread (max − min) of the values. Zero for an empty slice.
pub fn spread(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// Half-split trend of a metric series.
///
/// With fewer than three values the verdict is `Insufficient`. Otherwise the
/// series is split at `n / 2` and the verdict is `NotConverging` unless the
/// second half spreads strictly less than the first.
pub fn convergence_trend(values: &[f64]) -> ConvergenceVerdict {
    if values.len() < 3 {
        return ConvergenceVerdict::Insufficient;
    }
    let (first, second) = values.split_at(values.len() / 2);
    if spread(second) >= spread(first) {
        ConvergenceVerdict::NotConverging
    } else {
        ConvergenceVerdict::Converging
    }
}

/// Range statistics for a metric series with at least two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSummary {
    pub values: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub spread: f64,
    pub mean: f64,
    pub verdict: ConvergenceVerdict,
}

impl ConvergenceSummary {
    /// Returns `None` for fewer than two values.
    ///
    /// A spread below `converging` counts as converging, below `moderate` as
    /// moderate variance, anything wider as not converging.
    pub fn from_values(values: &[f64], converging: f64, moderate: f64) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spread = max - min;
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let verdict = if spread < converging {
            ConvergenceVerdict::Converging
        } else if spread < moderate {
            ConvergenceVerdict::ModerateVariance
        } else {
            ConvergenceVerdict::NotConverging
        };
        Some(Self {
            values: values.to_vec(),
            min,
            max,
            spread,
            mean,
            verdict,
        })
    }
}
