//! Trend and abrupt-change detection over value sequences
//!
//! Trend direction comes from a least-squares slope normalized by the series
//! mean; spikes and drops are first differences that stand out from the
//! distribution of all differences.

use crate::models::TrendDirection;
use crate::stats;

/// Normalized slope beyond which a series is considered trending
const TREND_SLOPE_THRESHOLD: f64 = 0.01;

/// Default |z| of a first difference to count as a spike or drop
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 2.0;

/// Minimum samples for spike/drop detection
const MIN_SAMPLES_FOR_SPIKES: usize = 3;

/// Spread of first differences, relative to the series magnitude, below
/// which the differences are rounding noise around a constant step
const DIFF_NOISE_FLOOR: f64 = 1e-9;

/// Direction and normalized slope of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Slope per sample divided by the series mean (raw slope when the mean is 0)
    pub slope: f64,
}

/// Abrupt changes found in a series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeDetection {
    pub has_spike: bool,
    pub has_drop: bool,
    /// Indices into the original series where the change landed
    pub indices: Vec<usize>,
}

pub fn analyze_trend(values: &[f64]) -> TrendAnalysis {
    if values.len() < 2 {
        return TrendAnalysis {
            direction: TrendDirection::Stable,
            slope: 0.0,
        };
    }

    let raw_slope = stats::linear_regression_slope(values);
    let mean = stats::mean(values);
    let slope = if mean != 0.0 { raw_slope / mean } else { raw_slope };

    let direction = if slope > TREND_SLOPE_THRESHOLD {
        TrendDirection::Increasing
    } else if slope < -TREND_SLOPE_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis { direction, slope }
}

pub fn detect_spike_or_drop(values: &[f64], threshold: f64) -> SpikeDetection {
    let mut detection = SpikeDetection::default();
    if values.len() < MIN_SAMPLES_FOR_SPIKES {
        return detection;
    }

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let diff_mean = stats::mean(&diffs);
    let diff_std = stats::std_dev(&diffs, Some(diff_mean));

    let scale = values
        .iter()
        .fold(diff_mean.abs(), |acc, v| acc.max(v.abs()))
        .max(1.0);
    if diff_std <= DIFF_NOISE_FLOOR * scale {
        return detection;
    }

    for (i, diff) in diffs.iter().enumerate() {
        let z = stats::z_score(*diff, diff_mean, diff_std);
        if z.abs() > threshold {
            detection.indices.push(i + 1);
            if *diff > 0.0 {
                detection.has_spike = true;
            } else if *diff < 0.0 {
                detection.has_drop = true;
            }
        }
    }

    detection
}
