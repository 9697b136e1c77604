//! Core data models for the anomaly detector

use serde::{Deserialize, Serialize};

/// Number of hour-of-day buckets in a baseline pattern
pub const HOURS_PER_DAY: usize = 24;

/// Number of day-of-week buckets in a baseline pattern
pub const DAYS_PER_WEEK: usize = 7;

/// Single sample produced by the metric source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDataPoint {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub value: f64,
}

impl MetricDataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Monitored host as listed by the metric source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub host_id: String,
    pub host_name: String,
}

impl HostInfo {
    pub fn new(host_id: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            host_name: host_name.into(),
        }
    }
}

/// History of one item on one host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    pub item_key: String,
    pub item_name: String,
    /// Latest value reported by the source, if any
    pub last_value: Option<f64>,
    /// Samples ordered by timestamp ascending
    pub history: Vec<MetricDataPoint>,
}

impl MetricSeries {
    /// Value to score: the source's last value, falling back to the newest sample
    pub fn current_value(&self) -> Option<f64> {
        self.last_value
            .or_else(|| self.history.last().map(|p| p.value))
    }

    pub fn values(&self) -> Vec<f64> {
        self.history.iter().map(|p| p.value).collect()
    }
}

/// Learned statistical profile of one metric on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBaseline {
    pub host_id: String,
    pub item_key: String,
    pub item_name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Cumulative number of samples blended into this baseline
    pub sample_count: u64,
    /// Epoch milliseconds
    pub last_updated: i64,
    /// Mean value per hour of day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_pattern: Option<[f64; HOURS_PER_DAY]>,
    /// Mean value per day of week, Monday first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_pattern: Option<[f64; DAYS_PER_WEEK]>,
}

impl MetricBaseline {
    /// Baseline with no samples
    pub fn empty(
        host_id: impl Into<String>,
        item_key: impl Into<String>,
        item_name: impl Into<String>,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            item_key: item_key.into(),
            item_name: item_name.into(),
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            sample_count: 0,
            last_updated: chrono::Utc::now().timestamp_millis(),
            hourly_pattern: None,
            daily_pattern: None,
        }
    }

    /// Hourly mean for the given hour, if a pattern was learned
    pub fn hourly_mean(&self, hour: usize) -> Option<f64> {
        self.hourly_pattern
            .as_ref()
            .and_then(|pattern| pattern.get(hour).copied())
    }

    /// Day-of-week mean for the given weekday, if a pattern was learned
    pub fn daily_mean(&self, weekday: usize) -> Option<f64> {
        self.daily_pattern
            .as_ref()
            .and_then(|pattern| pattern.get(weekday).copied())
    }
}

/// Severity of a single evaluation, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used when averaging scores into a host total
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 4.0,
            Severity::High => 3.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
            Severity::Normal => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evaluation of one metric value against its baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub host_id: String,
    pub host_name: String,
    pub item_key: String,
    pub item_name: String,
    pub current_value: f64,
    pub expected_value: f64,
    /// Percent deviation from the expected value
    pub deviation: f64,
    pub z_score: f64,
    /// 0-100
    pub anomaly_score: f64,
    pub severity: Severity,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub reason: String,
}

/// Per-host aggregate of one detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyDetectionResult {
    pub host_id: String,
    pub host_name: String,
    /// Severity-weighted 0-100 score
    pub total_score: f64,
    /// Non-normal scores in evaluation order
    pub anomalies: Vec<AnomalyScore>,
    pub timestamp: i64,
}

impl AnomalyDetectionResult {
    /// Most severe anomaly level on this host
    pub fn worst_severity(&self) -> Severity {
        self.anomalies
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(Severity::Normal)
    }
}

/// Fleet-wide summary derived from per-host results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub total_hosts: usize,
    pub hosts_with_anomalies: usize,
    pub top_anomalies: Vec<AnomalyScore>,
    pub timestamp: i64,
}

impl AnomalySummary {
    pub fn total_anomalies(&self) -> usize {
        self.critical_count + self.high_count + self.medium_count + self.low_count
    }
}

/// Output of one fleet-wide detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetReport {
    pub results: Vec<AnomalyDetectionResult>,
    pub summary: AnomalySummary,
}

/// Direction of a value sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Resource exhaustion risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// 24-hour extrapolation of a utilization metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub host_id: String,
    pub item_key: String,
    pub item_name: String,
    pub current_value: f64,
    pub trend: TrendDirection,
    /// Regression slope normalized by the series mean
    pub slope: f64,
    pub predicted_value_24h: f64,
    pub risk: RiskLevel,
    pub reason: String,
}
