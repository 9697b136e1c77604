//! End-to-end detection against the in-memory source and cache

use detector_lib::source::InMemorySource;
use detector_lib::store::{Cache, InMemoryCache};
use detector_lib::{
    AnomalyConfig, AnomalyDetector, AnomalyError, DetectorSettings, MetricDataPoint,
    MetricSeries, RiskLevel, Severity, TrendDirection, DEFAULT_RISK_THRESHOLD,
};
use std::sync::Arc;
use std::time::Duration;

const CPU: &str = "system.cpu.util";
const MEMORY: &str = "vm.memory.utilization";

/// Alternating 48/52 samples, one per minute up to now
fn steady_series(key: &str, samples: usize, last_value: f64) -> MetricSeries {
    let now = chrono::Utc::now().timestamp();
    MetricSeries {
        item_key: key.to_string(),
        item_name: key.to_string(),
        last_value: Some(last_value),
        history: (0..samples)
            .map(|i| {
                let value = if i % 2 == 0 { 48.0 } else { 52.0 };
                MetricDataPoint::new(now - (samples - i) as i64 * 60, value)
            })
            .collect(),
    }
}

/// Hourly samples increasing linearly up to `last`
fn rising_series(key: &str, start: f64, last: f64, samples: usize) -> MetricSeries {
    let now = chrono::Utc::now().timestamp();
    let step = (last - start) / (samples - 1) as f64;
    MetricSeries {
        item_key: key.to_string(),
        item_name: key.to_string(),
        last_value: None,
        history: (0..samples)
            .map(|i| MetricDataPoint::new(now - (samples - i) as i64 * 1800, start + step * i as f64))
            .collect(),
    }
}

fn config() -> AnomalyConfig {
    AnomalyConfig {
        enable_time_pattern: false,
        ..Default::default()
    }
}

fn detector(source: InMemorySource, cache: Arc<InMemoryCache>) -> AnomalyDetector {
    AnomalyDetector::new(Arc::new(source), cache, DetectorSettings::default())
}

#[tokio::test]
async fn test_anomalous_host_is_scored_and_persisted() {
    let cache = Arc::new(InMemoryCache::new());
    let source = InMemorySource::new()
        .with_host("10084", "web-01")
        .with_series("10084", steady_series(CPU, 40, 95.0))
        .with_series("10084", steady_series(MEMORY, 40, 50.0));
    let detector = detector(source, cache.clone());

    let result = detector
        .detect_anomalies_for_host("10084", &config())
        .await
        .unwrap();

    assert_eq!(result.host_name, "web-01");
    assert_eq!(result.anomalies.len(), 1);
    let anomaly = &result.anomalies[0];
    assert_eq!(anomaly.item_key, CPU);
    assert_eq!(anomaly.host_name, "web-01");
    assert_eq!(anomaly.severity, Severity::Critical);
    assert_eq!(anomaly.anomaly_score, 100.0);
    assert_eq!(result.total_score, 100.0);

    let raw = cache.get("scores:10084").await.unwrap().unwrap();
    assert!(raw.contains("\"host_id\":\"10084\""));
    let stored = detector.store().load_result("10084").await.unwrap().unwrap();
    assert_eq!(stored.anomalies.len(), 1);
}

#[tokio::test]
async fn test_insufficient_samples_are_skipped() {
    let source = InMemorySource::new()
        .with_host("10084", "web-01")
        .with_series("10084", steady_series(CPU, 10, 95.0));
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    let result = detector
        .detect_anomalies_for_host("10084", &config())
        .await
        .unwrap();

    assert!(result.anomalies.is_empty());
    assert_eq!(result.total_score, 0.0);

    // The baseline is still learned for the next run
    let baseline = detector.store().load_baseline("10084", CPU).await.unwrap().unwrap();
    assert_eq!(baseline.sample_count, 10);
}

#[tokio::test]
async fn test_baselines_accumulate_across_runs() {
    let cache = Arc::new(InMemoryCache::new());
    let source = InMemorySource::new()
        .with_host("10084", "web-01")
        .with_series("10084", steady_series(CPU, 20, 50.0));
    let detector = detector(source, cache);

    // 20 samples per run: the second run crosses the 30-sample minimum
    let first = detector.detect_anomalies_for_host("10084", &config()).await.unwrap();
    assert!(first.anomalies.is_empty());
    detector.detect_anomalies_for_host("10084", &config()).await.unwrap();

    let baseline = detector.store().load_baseline("10084", CPU).await.unwrap().unwrap();
    assert_eq!(baseline.sample_count, 40);
    assert!((baseline.mean - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unknown_host_or_no_metrics_is_none() {
    let source = InMemorySource::new().with_host("10084", "web-01");
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    assert!(detector.detect_anomalies_for_host("10084", &config()).await.is_none());
    assert!(detector.detect_anomalies_for_host("99999", &config()).await.is_none());
    assert!(detector.detect_host("99999", &config()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_host_is_dropped_from_fleet() {
    let source = InMemorySource::new()
        .with_host("1", "ok-01")
        .with_series("1", steady_series(CPU, 40, 50.0))
        .with_host("2", "broken-01")
        .with_series("2", steady_series(CPU, 40, 50.0))
        .with_failure("2")
        .with_host("3", "ok-02")
        .with_series("3", steady_series(CPU, 40, 50.0));
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    let results = detector.detect_anomalies_for_all_hosts(&config()).await;

    let mut ids: Vec<&str> = results.iter().map(|r| r.host_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_slow_host_times_out() {
    let source = InMemorySource::new()
        .with_host("1", "slow-01")
        .with_series("1", steady_series(CPU, 40, 50.0))
        .with_delay("1", Duration::from_millis(500))
        .with_host("2", "fast-01")
        .with_series("2", steady_series(CPU, 40, 50.0));
    let detector = AnomalyDetector::new(
        Arc::new(source),
        Arc::new(InMemoryCache::new()),
        DetectorSettings {
            host_timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );

    let err = detector.detect_host("1", &config()).await.unwrap_err();
    assert!(matches!(err, AnomalyError::SourceUnavailable(ref m) if m.contains("timed out")));

    let results = detector.detect_anomalies_for_all_hosts(&config()).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].host_id, "2");
}

#[tokio::test]
async fn test_fleet_results_sorted_by_total_score() {
    let source = InMemorySource::new()
        .with_host("quiet", "quiet-01")
        .with_series("quiet", steady_series(CPU, 40, 50.0))
        .with_host("mild", "mild-01")
        .with_series("mild", steady_series(CPU, 40, 62.0))
        .with_host("loud", "loud-01")
        .with_series("loud", steady_series(CPU, 40, 95.0));
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    let results = detector.detect_anomalies_for_all_hosts(&config()).await;

    assert_eq!(results.len(), 3);
    assert!(results
        .windows(2)
        .all(|w| w[0].total_score >= w[1].total_score));
    assert_eq!(results[0].host_id, "loud");
    assert_eq!(results[2].host_id, "quiet");
}

#[tokio::test]
async fn test_rising_cpu_predicts_high_risk() {
    let source = InMemorySource::new()
        .with_host("10084", "web-01")
        .with_series("10084", rising_series(CPU, 40.0, 85.0, 24))
        .with_series("10084", steady_series(MEMORY, 40, 50.0))
        .with_series("10084", rising_series("system.cpu.load[all,avg1]", 1.0, 95.0, 24));
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    let predictions = detector
        .predict_resource_exhaustion("10084", DEFAULT_RISK_THRESHOLD)
        .await;

    assert_eq!(predictions.len(), 1);
    let cpu = &predictions[0];
    assert_eq!(cpu.item_key, CPU);
    assert_eq!(cpu.trend, TrendDirection::Increasing);
    assert_eq!(cpu.risk, RiskLevel::High);
    assert_eq!(cpu.predicted_value_24h, 100.0);
}

#[tokio::test]
async fn test_prediction_source_failure_is_empty() {
    let source = InMemorySource::new()
        .with_host("10084", "web-01")
        .with_failure("10084");
    let detector = detector(source, Arc::new(InMemoryCache::new()));

    assert!(detector
        .predict_resource_exhaustion("10084", DEFAULT_RISK_THRESHOLD)
        .await
        .is_empty());
}
