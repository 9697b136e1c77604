//! Periodic fleet detection
//!
//! Runs the fleet pipeline on an interval, caches the latest
//! [`FleetReport`], and reports through Prometheus metrics and the health
//! registry.

use super::orchestrator::AnomalyDetector;
use crate::anomaly::create_anomaly_summary;
use crate::config::AnomalyConfig;
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::FleetReport;
use crate::observability::{DetectorMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

struct RunningLoop {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Interval-driven detection service
pub struct DetectionService {
    detector: AnomalyDetector,
    config: AnomalyConfig,
    health: HealthRegistry,
    metrics: DetectorMetrics,
    logger: StructuredLogger,
    running: Mutex<Option<RunningLoop>>,
}

impl DetectionService {
    pub fn new(detector: AnomalyDetector, config: AnomalyConfig, health: HealthRegistry) -> Self {
        Self {
            detector,
            config,
            health,
            metrics: DetectorMetrics::new(),
            logger: StructuredLogger::new("anomaly-detector"),
            running: Mutex::new(None),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start the detection loop. Returns false if it is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Detection service already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let service = Arc::clone(self);
        let task = tokio::spawn(async move { service.run(shutdown_rx).await });

        self.logger.log_startup(
            env!("CARGO_PKG_VERSION"),
            self.config.detection_interval_seconds,
            self.detector.settings().batch_size,
        );
        *running = Some(RunningLoop { shutdown_tx, task });
        true
    }

    /// Stop the loop and wait for an in-flight cycle to finish
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        let _ = running.shutdown_tx.send(());
        if let Err(e) = running.task.await {
            warn!(error = %e, "Detection loop ended abnormally");
        }
        self.logger.log_shutdown("stop requested");
    }

    async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_secs(self.config.detection_interval_seconds.max(1));
        info!(interval_secs = period.as_secs(), "Starting detection loop");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "Detection cycle failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detection loop");
                    break;
                }
            }
        }
    }

    /// Run one fleet detection cycle and cache its report
    pub async fn run_once(&self) -> Result<FleetReport> {
        let start = Instant::now();

        let results = match self.detector.try_detect_all_hosts(&self.config).await {
            Ok(results) => {
                self.health.set_healthy(components::METRIC_SOURCE).await;
                results
            }
            Err(e) => {
                self.health
                    .set_degraded(components::METRIC_SOURCE, format!("host listing failed: {}", e))
                    .await;
                return Err(e);
            }
        };

        for anomaly in results.iter().flat_map(|r| r.anomalies.iter()) {
            self.metrics.inc_anomalies_detected(anomaly.severity);
            self.logger.log_anomaly(anomaly);
        }
        self.metrics.set_hosts_monitored(results.len() as i64);

        let summary = create_anomaly_summary(&results);
        let report = FleetReport { results, summary };

        match self.detector.store().save_fleet(&report).await {
            Ok(()) => self.health.set_healthy(components::BASELINE_STORE).await,
            Err(e) => {
                warn!(error = %e, "Failed to cache fleet report");
                self.health
                    .set_degraded(components::BASELINE_STORE, e.to_string())
                    .await;
            }
        }
        if let Err(e) = self.detector.store().purge_expired().await {
            warn!(error = %e, "Failed to purge expired cache entries");
        }
        self.health.set_healthy(components::DETECTOR).await;

        let elapsed = start.elapsed();
        self.metrics.observe_cycle_latency(elapsed.as_secs_f64());
        self.logger.log_detection_cycle(
            report.results.len(),
            report.summary.hosts_with_anomalies,
            report.summary.total_anomalies(),
            elapsed.as_millis(),
        );
        Ok(report)
    }

    /// Cached fleet report, computed when missing or expired
    pub async fn latest_report(&self) -> Result<FleetReport> {
        if let Some(report) = self.detector.store().load_fleet().await? {
            return Ok(report);
        }
        self.run_once().await
    }
}
