//! Anomaly Detector - host metric anomaly detection service
//!
//! Learns per-host metric baselines from Zabbix history, scores current
//! values on an interval and serves results over HTTP.

use anyhow::{Context, Result};
use detector_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    source::{MetricSource, ZabbixSource},
    store::InMemoryCache,
    AnomalyDetector, DetectionService,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting anomaly-detector");

    let config = config::ServiceConfig::load()?;
    info!(
        zabbix_url = %config.zabbix_url,
        monitored_items = config.monitored_items.len(),
        interval_secs = config.detection_interval_seconds,
        "Detector configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRIC_SOURCE).await;
    health_registry.register(components::BASELINE_STORE).await;
    health_registry.register(components::DETECTOR).await;

    let logger = StructuredLogger::new(&config.service_name);

    let source: Arc<dyn MetricSource> = Arc::new(
        ZabbixSource::new(config.zabbix_config()).context("Failed to create Zabbix client")?,
    );
    let detector = AnomalyDetector::new(
        source,
        Arc::new(InMemoryCache::new()),
        config.detector_settings(),
    )
    .with_logger(logger.clone());

    let service = Arc::new(
        DetectionService::new(detector, config.anomaly_config(), health_registry.clone())
            .with_logger(logger),
    );

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), service.clone()));

    service.start().await;
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    health_registry.set_ready(false).await;
    service.stop().await;
    info!("Shutting down");

    Ok(())
}
