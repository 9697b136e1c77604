//! Statistical helpers for baseline learning and scoring
//!
//! All functions are pure and total: empty or short inputs produce zeros
//! rather than errors.

/// Default smoothing factor for [`ema`]
pub const DEFAULT_EMA_ALPHA: f64 = 0.2;

/// Lower/upper outlier fences derived from the interquartile range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub lower: f64,
    pub upper: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, optionally around a precomputed mean
pub fn std_dev(values: &[f64], mean_override: Option<f64>) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_override.unwrap_or_else(|| mean(values));
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Distance from the mean in standard deviations.
///
/// Returns 0 when `std_dev` is zero, so a zero-variance series reports every
/// value as normal.
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (value - mean) / std_dev
}

/// Sliding-window average; returns the input unchanged if shorter than the window
pub fn moving_average(values: &[f64], window_size: usize) -> Vec<f64> {
    if window_size == 0 || values.len() < window_size {
        return values.to_vec();
    }
    values
        .windows(window_size)
        .map(|w| w.iter().sum::<f64>() / window_size as f64)
        .collect()
}

/// Exponential moving average seeded with the first value
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(first) => *first,
        None => return out,
    };
    out.push(prev);
    for v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

pub fn iqr_bounds(values: &[f64]) -> IqrBounds {
    if values.is_empty() {
        return IqrBounds {
            lower: 0.0,
            upper: 0.0,
        };
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let q1 = sorted[((n as f64 * 0.25).floor() as usize).min(n - 1)];
    let q3 = sorted[((n as f64 * 0.75).floor() as usize).min(n - 1)];
    let iqr = q3 - q1;
    IqrBounds {
        lower: q1 - 1.5 * iqr,
        upper: q3 + 1.5 * iqr,
    }
}

/// Ordinary least-squares slope of values against their index
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

/// Smallest value, `None` for an empty slice
pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// Largest value, `None` for an empty slice
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}
