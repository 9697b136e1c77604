//! Per-host and fleet-wide detection pipeline

use super::prediction::predict_series;
use crate::anomaly::{aggregate_anomalies, AnomalyScorer};
use crate::baseline::BaselineLearner;
use crate::config::AnomalyConfig;
use crate::error::{AnomalyError, Result};
use crate::models::{AnomalyDetectionResult, HostInfo, MetricBaseline, TrendPrediction};
use crate::observability::{DetectorMetrics, StructuredLogger};
use crate::source::MetricSource;
use crate::store::{BaselineStore, Cache, StoreTtls};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Items fetched for every host unless configured otherwise
pub const DEFAULT_MONITORED_ITEMS: &[&str] = &[
    "system.cpu.util",
    "system.cpu.load[all,avg1]",
    "vm.memory.utilization",
    "vfs.fs.size[/,pused]",
    "net.if.in[eth0]",
    "net.if.out[eth0]",
];

const SECONDS_PER_HOUR: i64 = 3600;

/// Window used for exhaustion prediction
const PREDICTION_WINDOW_HOURS: i64 = 24;

/// Orchestration settings
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Item keys requested from the source; empty requests every item
    pub monitored_items: Vec<String>,
    /// Hosts processed concurrently per batch
    pub batch_size: usize,
    /// Deadline for one host's collect, learn and score pipeline
    pub host_timeout: Duration,
    pub ttls: StoreTtls,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            monitored_items: DEFAULT_MONITORED_ITEMS.iter().map(|s| s.to_string()).collect(),
            batch_size: 5,
            host_timeout: Duration::from_secs(30),
            ttls: StoreTtls::default(),
        }
    }
}

/// Runs anomaly detection against a metric source.
///
/// Cheap to clone; clones share the source, the store and its key locks.
#[derive(Clone)]
pub struct AnomalyDetector {
    source: Arc<dyn MetricSource>,
    store: BaselineStore,
    settings: Arc<DetectorSettings>,
    metrics: DetectorMetrics,
    logger: StructuredLogger,
}

impl AnomalyDetector {
    pub fn new(source: Arc<dyn MetricSource>, cache: Arc<dyn Cache>, settings: DetectorSettings) -> Self {
        let store = BaselineStore::with_ttls(cache, settings.ttls);
        Self {
            source,
            store,
            settings: Arc::new(settings),
            metrics: DetectorMetrics::new(),
            logger: StructuredLogger::new("anomaly-detector"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Detect anomalies on one host, surfacing errors.
    ///
    /// `Ok(None)` when the host is unknown or reports no monitored metrics.
    pub async fn detect_host(
        &self,
        host_id: &str,
        config: &AnomalyConfig,
    ) -> Result<Option<AnomalyDetectionResult>> {
        self.with_host_timeout(host_id, async {
            match self.source.get_host(host_id).await? {
                Some(host) => self.analyze_host(&host, config).await,
                None => {
                    debug!(host_id = %host_id, "Host not found in metric source");
                    Ok(None)
                }
            }
        })
        .await
    }

    /// Detect anomalies on one host; failures are logged and yield `None`
    pub async fn detect_anomalies_for_host(
        &self,
        host_id: &str,
        config: &AnomalyConfig,
    ) -> Option<AnomalyDetectionResult> {
        let outcome = self.detect_host(host_id, config).await;
        self.flatten(host_id, outcome)
    }

    /// Detect anomalies on every enabled host, highest total score first.
    ///
    /// A failed host listing is logged and yields an empty fleet.
    pub async fn detect_anomalies_for_all_hosts(
        &self,
        config: &AnomalyConfig,
    ) -> Vec<AnomalyDetectionResult> {
        match self.try_detect_all_hosts(config).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Failed to list hosts for detection");
                Vec::new()
            }
        }
    }

    /// Like [`detect_anomalies_for_all_hosts`](Self::detect_anomalies_for_all_hosts)
    /// but returns the host listing error
    pub async fn try_detect_all_hosts(
        &self,
        config: &AnomalyConfig,
    ) -> Result<Vec<AnomalyDetectionResult>> {
        let hosts = self.source.list_enabled_hosts().await?;
        let batch_size = self.settings.batch_size.max(1);
        let mut results = Vec::with_capacity(hosts.len());

        for batch in hosts.chunks(batch_size) {
            let mut join_set = JoinSet::new();
            for host in batch {
                let detector = self.clone();
                let host = host.clone();
                let config = config.clone();
                join_set.spawn(async move {
                    let outcome = detector
                        .with_host_timeout(&host.host_id, detector.analyze_host(&host, &config))
                        .await;
                    detector.flatten(&host.host_id, outcome)
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(Some(result)) => results.push(result),
                    Ok(None) => {}
                    Err(e) => {
                        error!(error = %e, "Host detection task failed");
                        self.metrics.inc_host_failures();
                    }
                }
            }
        }

        results.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        info!(
            hosts = hosts.len(),
            results = results.len(),
            "Fleet detection completed"
        );
        Ok(results)
    }

    /// Utilization metrics on `host_id` at medium or high risk of exhaustion
    /// within 24 hours
    pub async fn predict_resource_exhaustion(
        &self,
        host_id: &str,
        threshold: f64,
    ) -> Vec<TrendPrediction> {
        let time_from = Utc::now().timestamp() - PREDICTION_WINDOW_HOURS * SECONDS_PER_HOUR;
        let series = match self
            .source
            .get_history(host_id, &self.settings.monitored_items, time_from)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                warn!(host_id = %host_id, error = %e, "Failed to fetch history for prediction");
                return Vec::new();
            }
        };

        series
            .iter()
            .filter_map(|s| predict_series(host_id, s, threshold))
            .collect()
    }

    async fn analyze_host(
        &self,
        host: &HostInfo,
        config: &AnomalyConfig,
    ) -> Result<Option<AnomalyDetectionResult>> {
        let host_id = host.host_id.as_str();
        let time_from =
            Utc::now().timestamp() - i64::from(config.baseline_window_hours) * SECONDS_PER_HOUR;
        let series = self
            .source
            .get_history(host_id, &self.settings.monitored_items, time_from)
            .await?;
        if series.is_empty() {
            debug!(host_id = %host_id, "No monitored metrics for host");
            return Ok(None);
        }

        let learner = BaselineLearner::new(config.hour_clock);
        let scorer = AnomalyScorer::new(config.clone());
        let mut scores = Vec::with_capacity(series.len());

        for metric in &series {
            let baseline = self
                .store
                .update_baseline(host_id, &metric.item_key, |existing| {
                    learner.create_baseline(
                        host_id,
                        &metric.item_key,
                        &metric.item_name,
                        &metric.history,
                        existing,
                    )
                })
                .await?;
            self.metrics.inc_baselines_updated();

            if let Err(e) = ensure_sufficient(&baseline, config) {
                debug!(host_id = %host_id, error = %e, "Skipping metric");
                continue;
            }
            let Some(value) = metric.current_value() else {
                debug!(host_id = %host_id, item_key = %metric.item_key, "No current value");
                continue;
            };

            let mut score = scorer.analyze_value(value, &baseline);
            score.host_name = host.host_name.clone();
            scores.push(score);
        }

        let result = aggregate_anomalies(host_id, &host.host_name, scores);
        self.store.save_result(&result).await?;

        debug!(
            host_id = %host_id,
            total_score = result.total_score,
            anomalies = result.anomalies.len(),
            "Host detection completed"
        );
        Ok(Some(result))
    }

    async fn with_host_timeout<F, T>(&self, host_id: &str, pipeline: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.settings.host_timeout, pipeline).await;
        self.metrics.observe_host_latency(start.elapsed().as_secs_f64());

        outcome.unwrap_or_else(|_| {
            Err(AnomalyError::SourceUnavailable(format!(
                "detection for host {} timed out after {}s",
                host_id,
                self.settings.host_timeout.as_secs_f64()
            )))
        })
    }

    fn flatten(
        &self,
        host_id: &str,
        outcome: Result<Option<AnomalyDetectionResult>>,
    ) -> Option<AnomalyDetectionResult> {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                self.metrics.inc_host_failures();
                self.logger.log_host_skipped(host_id, &e.to_string());
                None
            }
        }
    }
}

fn ensure_sufficient(baseline: &MetricBaseline, config: &AnomalyConfig) -> Result<()> {
    if baseline.sample_count < config.min_sample_count {
        return Err(AnomalyError::InsufficientData {
            item_key: baseline.item_key.clone(),
            samples: baseline.sample_count,
            required: config.min_sample_count,
        });
    }
    Ok(())
}
