//! Baseline learning
//!
//! Builds a [`MetricBaseline`] from a window of samples and blends it into
//! any previously learned baseline with a fixed exponential weight.

use crate::config::HourClock;
use crate::models::{MetricBaseline, MetricDataPoint, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::stats;

/// Weight given to the newest batch when blending into an existing baseline
pub const BLEND_ALPHA: f64 = 0.3;

/// Learns and updates per-metric baselines
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineLearner {
    clock: HourClock,
}

impl BaselineLearner {
    pub fn new(clock: HourClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> HourClock {
        self.clock
    }

    /// Build a baseline from `points`, blended into `existing` when it has samples.
    ///
    /// Empty `points` return `existing` unchanged, or an empty baseline.
    pub fn create_baseline(
        &self,
        host_id: &str,
        item_key: &str,
        item_name: &str,
        points: &[MetricDataPoint],
        existing: Option<&MetricBaseline>,
    ) -> MetricBaseline {
        if points.is_empty() {
            return existing
                .cloned()
                .unwrap_or_else(|| MetricBaseline::empty(host_id, item_key, item_name));
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let mean = stats::mean(&values);
        let std_dev = stats::std_dev(&values, Some(mean));

        let clock = self.clock;
        let hourly: [f64; HOURS_PER_DAY] =
            bucket_means(points, mean, |ts| clock.hour_of(ts));
        let daily: [f64; DAYS_PER_WEEK] =
            bucket_means(points, mean, |ts| clock.weekday_of(ts));

        let fresh = MetricBaseline {
            host_id: host_id.to_string(),
            item_key: item_key.to_string(),
            item_name: item_name.to_string(),
            mean,
            std_dev,
            min: stats::min(&values).unwrap_or(mean),
            max: stats::max(&values).unwrap_or(mean),
            sample_count: points.len() as u64,
            last_updated: chrono::Utc::now().timestamp_millis(),
            hourly_pattern: Some(hourly),
            daily_pattern: Some(daily),
        };

        match existing {
            Some(old) if old.sample_count > 0 => merge_baselines(old, fresh),
            _ => fresh,
        }
    }
}

/// Blend a freshly computed baseline into an older one.
///
/// Mean, standard deviation and pattern buckets move `BLEND_ALPHA` of the way
/// toward the new batch; min/max only widen and sample counts add up.
pub fn merge_baselines(old: &MetricBaseline, fresh: MetricBaseline) -> MetricBaseline {
    MetricBaseline {
        mean: blend(fresh.mean, old.mean),
        std_dev: blend(fresh.std_dev, old.std_dev),
        min: fresh.min.min(old.min),
        max: fresh.max.max(old.max),
        sample_count: old.sample_count.saturating_add(fresh.sample_count),
        hourly_pattern: blend_pattern(fresh.hourly_pattern, old.hourly_pattern),
        daily_pattern: blend_pattern(fresh.daily_pattern, old.daily_pattern),
        ..fresh
    }
}

fn blend(new: f64, old: f64) -> f64 {
    BLEND_ALPHA * new + (1.0 - BLEND_ALPHA) * old
}

fn blend_pattern<const N: usize>(new: Option<[f64; N]>, old: Option<[f64; N]>) -> Option<[f64; N]> {
    match (new, old) {
        (Some(n), Some(o)) => Some(std::array::from_fn(|i| blend(n[i], o[i]))),
        (n, o) => n.or(o),
    }
}

/// Mean value per bucket; buckets without samples take `fallback`
fn bucket_means<const N: usize>(
    points: &[MetricDataPoint],
    fallback: f64,
    bucket: impl Fn(i64) -> usize,
) -> [f64; N] {
    let mut sums = [0.0; N];
    let mut counts = [0u64; N];
    for p in points {
        let idx = bucket(p.timestamp);
        if idx < N {
            sums[idx] += p.value;
            counts[idx] += 1;
        }
    }

    let mut means = [fallback; N];
    for i in 0..N {
        if counts[i] > 0 {
            means[i] = sums[i] / counts[i] as f64;
        }
    }
    means
}
