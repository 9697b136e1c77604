//! Host metric anomaly detection library
//!
//! This crate provides the core functionality for:
//! - Baseline learning with hour-of-day and day-of-week patterns
//! - Z-score anomaly scoring and fleet aggregation
//! - Trend analysis and resource exhaustion prediction
//! - Metric sources (Zabbix, in-memory) and a TTL cache for baselines
//! - Health checks and observability

pub mod anomaly;
pub mod baseline;
pub mod config;
pub mod detector;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod source;
pub mod stats;
pub mod store;

pub use config::{AnomalyConfig, HourClock};
pub use detector::{AnomalyDetector, DetectionService, DetectorSettings, DEFAULT_RISK_THRESHOLD};
pub use error::{AnomalyError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DetectorMetrics, StructuredLogger};
