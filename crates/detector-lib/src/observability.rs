//! Observability for the detection service
//!
//! Provides:
//! - Prometheus metrics (cycle and host latency, fleet size, anomaly counts)
//! - Event-tagged structured logging with tracing

use crate::models::{AnomalyScore, Severity};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for detection latencies (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    cycle_latency_seconds: Histogram,
    host_latency_seconds: Histogram,
    hosts_monitored: IntGauge,
    anomalies_detected: IntCounterVec,
    host_failures: IntCounter,
    baselines_updated: IntCounter,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "anomaly_detector_cycle_latency_seconds",
                "Time spent running one fleet-wide detection cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            host_latency_seconds: register_histogram!(
                "anomaly_detector_host_latency_seconds",
                "Time spent collecting, learning and scoring one host",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register host_latency_seconds"),

            hosts_monitored: register_int_gauge!(
                "anomaly_detector_hosts_monitored",
                "Number of hosts with a result in the last detection cycle"
            )
            .expect("Failed to register hosts_monitored"),

            anomalies_detected: register_int_counter_vec!(
                "anomaly_detector_anomalies_detected_total",
                "Total number of anomalies detected",
                &["severity"]
            )
            .expect("Failed to register anomalies_detected"),

            host_failures: register_int_counter!(
                "anomaly_detector_host_failures_total",
                "Hosts dropped from a cycle because of source errors or timeouts"
            )
            .expect("Failed to register host_failures"),

            baselines_updated: register_int_counter!(
                "anomaly_detector_baselines_updated_total",
                "Total number of baseline updates written"
            )
            .expect("Failed to register baselines_updated"),
        }
    }
}

/// Handle to the process-wide detector metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn observe_host_latency(&self, duration_secs: f64) {
        self.inner().host_latency_seconds.observe(duration_secs);
    }

    pub fn set_hosts_monitored(&self, count: i64) {
        self.inner().hosts_monitored.set(count);
    }

    pub fn inc_anomalies_detected(&self, severity: Severity) {
        self.inner()
            .anomalies_detected
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn inc_host_failures(&self) {
        self.inner().host_failures.inc();
    }

    pub fn inc_baselines_updated(&self) {
        self.inner().baselines_updated.inc();
    }

    pub fn anomalies_detected(&self, severity: Severity) -> u64 {
        self.inner()
            .anomalies_detected
            .with_label_values(&[severity.as_str()])
            .get()
    }

    pub fn host_failures(&self) -> u64 {
        self.inner().host_failures.get()
    }

    pub fn baselines_updated(&self) -> u64 {
        self.inner().baselines_updated.get()
    }
}

/// Structured logger for detector events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Log one non-normal score; critical ones at warn level
    pub fn log_anomaly(&self, anomaly: &AnomalyScore) {
        match anomaly.severity {
            Severity::Critical => {
                warn!(
                    event = "anomaly_detected",
                    service = %self.service_name,
                    host_id = %anomaly.host_id,
                    host_name = %anomaly.host_name,
                    item_key = %anomaly.item_key,
                    severity = %anomaly.severity,
                    current_value = anomaly.current_value,
                    expected_value = anomaly.expected_value,
                    z_score = anomaly.z_score,
                    anomaly_score = anomaly.anomaly_score,
                    reason = %anomaly.reason,
                    "Critical anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    service = %self.service_name,
                    host_id = %anomaly.host_id,
                    host_name = %anomaly.host_name,
                    item_key = %anomaly.item_key,
                    severity = %anomaly.severity,
                    current_value = anomaly.current_value,
                    expected_value = anomaly.expected_value,
                    z_score = anomaly.z_score,
                    anomaly_score = anomaly.anomaly_score,
                    reason = %anomaly.reason,
                    "Anomaly detected"
                );
            }
        }
    }

    pub fn log_detection_cycle(
        &self,
        hosts_processed: usize,
        hosts_with_anomalies: usize,
        total_anomalies: usize,
        duration_ms: u128,
    ) {
        info!(
            event = "detection_cycle",
            service = %self.service_name,
            hosts_processed = hosts_processed,
            hosts_with_anomalies = hosts_with_anomalies,
            total_anomalies = total_anomalies,
            duration_ms = duration_ms as u64,
            "Detection cycle completed"
        );
    }

    pub fn log_host_skipped(&self, host_id: &str, reason: &str) {
        warn!(
            event = "host_skipped",
            service = %self.service_name,
            host_id = %host_id,
            reason = %reason,
            "Host skipped in detection cycle"
        );
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64, batch_size: usize) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            interval_secs = interval_secs,
            batch_size = batch_size,
            "Anomaly detector started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Anomaly detector shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_metrics_record() {
        let metrics = DetectorMetrics::new();
        let before = metrics.anomalies_detected(Severity::High);

        metrics.observe_cycle_latency(0.5);
        metrics.observe_host_latency(0.02);
        metrics.set_hosts_monitored(12);
        metrics.inc_anomalies_detected(Severity::High);

        // Collectors are process-wide, other tests may increment concurrently
        assert!(metrics.anomalies_detected(Severity::High) > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("anomaly-detector");
        assert_eq!(logger.service_name(), "anomaly-detector");
    }
}
