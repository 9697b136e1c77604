//! Anomaly scoring and pattern analysis
//!
//! This module provides:
//! - Z-score scoring of current values against learned baselines
//! - Trend direction and spike/drop detection over value sequences
//! - Host and fleet aggregation of scores

mod aggregator;
mod scorer;
mod trend;

pub use aggregator::{aggregate_anomalies, create_anomaly_summary, TOP_ANOMALIES};
pub use scorer::AnomalyScorer;
pub use trend::{
    analyze_trend, detect_spike_or_drop, SpikeDetection, TrendAnalysis, DEFAULT_SPIKE_THRESHOLD,
};
