//! Service configuration

use anyhow::{Context, Result};
use detector_lib::detector::DEFAULT_MONITORED_ITEMS;
use detector_lib::source::ZabbixConfig;
use detector_lib::store::StoreTtls;
use detector_lib::{AnomalyConfig, DetectorSettings, HourClock};
use serde::Deserialize;
use std::time::Duration;

/// Service configuration, read from an optional `detector.{toml,yaml,json}`
/// file and `DETECTOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// API server port for health/metrics/results
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Zabbix JSON-RPC endpoint
    #[serde(default = "default_zabbix_url")]
    pub zabbix_url: String,

    #[serde(default)]
    pub zabbix_token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Semicolon-separated in the environment, item keys may contain commas
    #[serde(default = "default_monitored_items")]
    pub monitored_items: Vec<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_host_timeout")]
    pub host_timeout_secs: u64,

    #[serde(default = "default_z_score_threshold")]
    pub z_score_threshold: f64,

    #[serde(default = "default_min_sample_count")]
    pub min_sample_count: u64,

    #[serde(default = "default_baseline_window")]
    pub baseline_window_hours: u32,

    #[serde(default = "default_detection_interval")]
    pub detection_interval_seconds: u64,

    #[serde(default = "default_true")]
    pub enable_time_pattern: bool,

    #[serde(default)]
    pub enable_day_pattern: bool,

    /// `local` or `utc`
    #[serde(default)]
    pub hour_clock: HourClock,
}

fn default_service_name() -> String {
    "anomaly-detector".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_zabbix_url() -> String {
    ZabbixConfig::default().url
}

fn default_request_timeout() -> u64 {
    30
}

fn default_monitored_items() -> Vec<String> {
    DEFAULT_MONITORED_ITEMS.iter().map(|s| s.to_string()).collect()
}

fn default_batch_size() -> usize {
    5
}

fn default_host_timeout() -> u64 {
    30
}

fn default_z_score_threshold() -> f64 {
    3.0
}

fn default_min_sample_count() -> u64 {
    30
}

fn default_baseline_window() -> u32 {
    24
}

fn default_detection_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl ServiceConfig {
    /// Load configuration from `detector.*` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("detector")
    }

    pub fn load_from(file_stem: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("DETECTOR")
                    .try_parsing(true)
                    .list_separator(";")
                    .with_list_parse_key("monitored_items"),
            )
            .build()
            .context("Failed to read detector configuration")?;

        config
            .try_deserialize()
            .context("Invalid detector configuration")
    }

    pub fn anomaly_config(&self) -> AnomalyConfig {
        AnomalyConfig {
            z_score_threshold: self.z_score_threshold,
            min_sample_count: self.min_sample_count,
            baseline_window_hours: self.baseline_window_hours,
            detection_interval_seconds: self.detection_interval_seconds,
            enable_time_pattern: self.enable_time_pattern,
            enable_day_pattern: self.enable_day_pattern,
            hour_clock: self.hour_clock,
        }
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            monitored_items: self.monitored_items.clone(),
            batch_size: self.batch_size,
            host_timeout: Duration::from_secs(self.host_timeout_secs),
            ttls: StoreTtls::default(),
        }
    }

    pub fn zabbix_config(&self) -> ZabbixConfig {
        ZabbixConfig {
            url: self.zabbix_url.clone(),
            api_token: self.zabbix_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
