//! Detection configuration

use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Clock used to bucket samples into hour-of-day and day-of-week patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourClock {
    /// Timezone of the running process
    #[default]
    Local,
    Utc,
}

impl HourClock {
    /// Hour of day (0-23) of a unix timestamp in seconds
    pub fn hour_of(&self, timestamp: i64) -> usize {
        let utc = DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
        self.hour_at(utc)
    }

    /// Day of week (Monday = 0) of a unix timestamp in seconds
    pub fn weekday_of(&self, timestamp: i64) -> usize {
        let utc = DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
        self.weekday_at(utc)
    }

    pub fn hour_at(&self, at: DateTime<Utc>) -> usize {
        match self {
            HourClock::Local => at.with_timezone(&Local).hour() as usize,
            HourClock::Utc => at.hour() as usize,
        }
    }

    pub fn weekday_at(&self, at: DateTime<Utc>) -> usize {
        match self {
            HourClock::Local => at.with_timezone(&Local).weekday().num_days_from_monday() as usize,
            HourClock::Utc => at.weekday().num_days_from_monday() as usize,
        }
    }
}

/// Tuning knobs for baseline learning and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// |z| at or above which a value is at least medium severity
    pub z_score_threshold: f64,
    /// Samples required before a metric is scored
    pub min_sample_count: u64,
    /// History window fetched per detection run
    pub baseline_window_hours: u32,
    pub detection_interval_seconds: u64,
    /// Use the hour-of-day mean as the expected value
    pub enable_time_pattern: bool,
    /// Offset the expected value by the day-of-week pattern
    pub enable_day_pattern: bool,
    pub hour_clock: HourClock,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_score_threshold: 3.0,
            min_sample_count: 30,
            baseline_window_hours: 24,
            detection_interval_seconds: 60,
            enable_time_pattern: true,
            enable_day_pattern: false,
            hour_clock: HourClock::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnomalyConfig::default();
        assert_eq!(config.z_score_threshold, 3.0);
        assert_eq!(config.min_sample_count, 30);
        assert_eq!(config.baseline_window_hours, 24);
        assert_eq!(config.detection_interval_seconds, 60);
        assert_eq!(config.hour_clock, HourClock::Local);
    }

    #[test]
    fn test_utc_clock_buckets() {
        // 2024-01-01T13:30:00Z, a Monday
        let ts = 1_704_115_800;
        assert_eq!(HourClock::Utc.hour_of(ts), 13);
        assert_eq!(HourClock::Utc.weekday_of(ts), 0);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AnomalyConfig =
            serde_json::from_str(r#"{"z_score_threshold": 2.5, "hour_clock": "utc"}"#).unwrap();
        assert_eq!(config.z_score_threshold, 2.5);
        assert_eq!(config.min_sample_count, 30);
        assert_eq!(config.hour_clock, HourClock::Utc);
    }
}
