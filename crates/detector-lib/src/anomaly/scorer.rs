//! Scoring of a current value against its learned baseline
//!
//! Computes a Z-score against the expected value (optionally time-of-day
//! adjusted), maps it to a 0-100 score and classifies severity.

use chrono::{DateTime, Utc};

use crate::config::AnomalyConfig;
use crate::models::{AnomalyScore, MetricBaseline, Severity};
use crate::stats;

/// |z| mapped to the maximum score of 100
const MAX_SCORE_Z: f64 = 6.0;

/// Fraction of the mean used as a standard deviation floor
const STD_DEV_FLOOR_RATIO: f64 = 0.1;

/// Values this far above the historical maximum are at least medium severity
const HISTORICAL_MAX_FACTOR: f64 = 1.5;

const CRITICAL_Z: f64 = 5.0;
const HIGH_Z: f64 = 4.0;
const LOW_Z: f64 = 2.0;

/// Evaluates metric values against baselines
#[derive(Debug, Clone, Default)]
pub struct AnomalyScorer {
    config: AnomalyConfig,
}

impl AnomalyScorer {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Score `value` as of now
    pub fn analyze_value(&self, value: f64, baseline: &MetricBaseline) -> AnomalyScore {
        self.analyze_value_at(value, baseline, Utc::now())
    }

    /// Score `value` as of `at`, which selects the hour/day pattern bucket.
    ///
    /// `host_name` is left empty for the caller to fill in.
    pub fn analyze_value_at(
        &self,
        value: f64,
        baseline: &MetricBaseline,
        at: DateTime<Utc>,
    ) -> AnomalyScore {
        let expected = self.expected_value(baseline, at);
        let effective_std = baseline.std_dev.max(baseline.mean * STD_DEV_FLOOR_RATIO);

        let z_score = stats::z_score(value, expected, effective_std);
        let deviation = if expected == 0.0 {
            value
        } else {
            (value - expected) / expected * 100.0
        };
        let anomaly_score = (z_score.abs() / MAX_SCORE_Z * 100.0).clamp(0.0, 100.0);

        let (mut severity, mut reason) = self.classify(z_score, deviation);

        if value > baseline.max * HISTORICAL_MAX_FACTOR {
            severity = severity.max(Severity::Medium);
            reason = format!(
                "Value {:.2} exceeds historical maximum {:.2} by more than 50%",
                value, baseline.max
            );
        }

        AnomalyScore {
            host_id: baseline.host_id.clone(),
            host_name: String::new(),
            item_key: baseline.item_key.clone(),
            item_name: baseline.item_name.clone(),
            current_value: value,
            expected_value: expected,
            deviation,
            z_score,
            anomaly_score,
            severity,
            timestamp: at.timestamp_millis(),
            reason,
        }
    }

    fn expected_value(&self, baseline: &MetricBaseline, at: DateTime<Utc>) -> f64 {
        let clock = self.config.hour_clock;
        let mut expected = if self.config.enable_time_pattern {
            baseline
                .hourly_mean(clock.hour_at(at))
                .unwrap_or(baseline.mean)
        } else {
            baseline.mean
        };

        if self.config.enable_day_pattern {
            if let Some(day_mean) = baseline.daily_mean(clock.weekday_at(at)) {
                expected += day_mean - baseline.mean;
            }
        }
        expected
    }

    fn classify(&self, z_score: f64, deviation: f64) -> (Severity, String) {
        let abs_z = z_score.abs();
        let direction = if z_score >= 0.0 { "above" } else { "below" };

        if abs_z >= CRITICAL_Z {
            (
                Severity::Critical,
                format!("Critical deviation: {:.1}% {} expected", deviation.abs(), direction),
            )
        } else if abs_z >= HIGH_Z {
            (
                Severity::High,
                format!("High deviation: {:.1}% {} expected", deviation.abs(), direction),
            )
        } else if abs_z >= self.config.z_score_threshold {
            (
                Severity::Medium,
                format!("Moderate deviation: {:.1}% {} expected", deviation.abs(), direction),
            )
        } else if abs_z >= LOW_Z {
            (
                Severity::Low,
                format!("Slight deviation: {:.1}% {} expected", deviation.abs(), direction),
            )
        } else {
            (
                Severity::Normal,
                format!("Within normal range ({:.1}% from expected)", deviation),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(mean: f64, std_dev: f64) -> MetricBaseline {
        let mut b = MetricBaseline::empty("10084", "system.cpu.util", "CPU utilization");
        b.mean = mean;
        b.std_dev = std_dev;
        b.min = mean - 3.0 * std_dev;
        b.max = mean + 10.0 * std_dev;
        b.sample_count = 100;
        b
    }

    fn scorer() -> AnomalyScorer {
        AnomalyScorer::new(AnomalyConfig {
            enable_time_pattern: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_value_at_mean_is_normal() {
        let score = scorer().analyze_value(50.0, &baseline(50.0, 5.0));
        assert_eq!(score.z_score, 0.0);
        assert_eq!(score.severity, Severity::Normal);
        assert_eq!(score.anomaly_score, 0.0);
    }

    #[test]
    fn test_six_sigma_is_critical() {
        let score = scorer().analyze_value(80.0, &baseline(50.0, 5.0));
        assert!((score.z_score - 6.0).abs() < 1e-9);
        assert!((score.anomaly_score - 100.0).abs() < 1e-9);
        assert_eq!(score.severity, Severity::Critical);
        assert!((score.deviation - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_thresholds() {
        let s = scorer();
        let b = baseline(50.0, 5.0);
        assert_eq!(s.analyze_value(60.0, &b).severity, Severity::Low); // z = 2
        assert_eq!(s.analyze_value(65.0, &b).severity, Severity::Medium); // z = 3
        assert_eq!(s.analyze_value(70.0, &b).severity, Severity::High); // z = 4
        assert_eq!(s.analyze_value(75.0, &b).severity, Severity::Critical); // z = 5
        assert_eq!(s.analyze_value(25.0, &b).severity, Severity::Critical); // z = -5
    }

    #[test]
    fn test_severity_monotonic_in_z() {
        let s = scorer();
        let b = baseline(50.0, 5.0);
        let mut previous = Severity::Normal;
        for step in 0..80 {
            let value = 50.0 + step as f64 * 0.5;
            let severity = s.analyze_value(value, &b).severity;
            assert!(severity >= previous, "severity dropped at {}", value);
            previous = severity;
        }
    }

    #[test]
    fn test_std_dev_floor() {
        // std-dev 0 would make any deviation infinite; floor is 10% of mean
        let score = scorer().analyze_value(110.0, &baseline(100.0, 0.0));
        assert!((score.z_score - 1.0).abs() < 1e-9);
        assert_eq!(score.severity, Severity::Normal);
    }

    #[test]
    fn test_zero_expected_uses_raw_deviation() {
        let score = scorer().analyze_value(3.0, &baseline(0.0, 1.0));
        assert_eq!(score.deviation, 3.0);
    }

    #[test]
    fn test_historical_max_breach_upgrades() {
        let mut b = baseline(50.0, 20.0);
        b.max = 40.0;
        // z = 1.5 -> normal, but 80 > 40 * 1.5
        let score = scorer().analyze_value(80.0, &b);
        assert_eq!(score.severity, Severity::Medium);
        assert!(score.reason.contains("historical maximum"));
    }

    #[test]
    fn test_historical_max_breach_never_downgrades() {
        let mut b = baseline(50.0, 5.0);
        b.max = 52.0;
        let score = scorer().analyze_value(80.0, &b);
        assert_eq!(score.severity, Severity::Critical);
        assert!(score.reason.contains("historical maximum"));
    }

    #[test]
    fn test_hourly_pattern_sets_expected_value() {
        let mut b = baseline(50.0, 5.0);
        let mut pattern = [50.0; 24];
        pattern[13] = 80.0;
        b.hourly_pattern = Some(pattern);

        let s = AnomalyScorer::new(AnomalyConfig {
            hour_clock: crate::config::HourClock::Utc,
            ..Default::default()
        });
        // 2024-01-01T13:30:00Z
        let at = DateTime::from_timestamp(1_704_115_800, 0).unwrap();
        let score = s.analyze_value_at(80.0, &b, at);
        assert_eq!(score.expected_value, 80.0);
        assert_eq!(score.severity, Severity::Normal);
    }

    #[test]
    fn test_day_pattern_offsets_expected_value() {
        let mut b = baseline(50.0, 5.0);
        let mut daily = [50.0; 7];
        daily[0] = 60.0;
        b.daily_pattern = Some(daily);

        let s = AnomalyScorer::new(AnomalyConfig {
            enable_time_pattern: false,
            enable_day_pattern: true,
            hour_clock: crate::config::HourClock::Utc,
            ..Default::default()
        });
        let monday = DateTime::from_timestamp(1_704_115_800, 0).unwrap();
        assert_eq!(s.analyze_value_at(60.0, &b, monday).expected_value, 60.0);
    }

    #[test]
    fn test_expected_value_always_normal() {
        let s = scorer();
        for (mean, std) in [(0.0, 0.0), (1.0, 0.5), (50.0, 5.0), (1e6, 1e3)] {
            let b = baseline(mean, std);
            let score = s.analyze_value(mean, &b);
            assert_eq!(score.z_score, 0.0);
            assert_eq!(score.severity, Severity::Normal);
        }
    }
}
