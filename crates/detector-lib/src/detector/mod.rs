//! Detection orchestration
//!
//! Ties the metric source, baseline store, learner and scorer together:
//! - Per-host pipeline (collect, learn, score, aggregate, persist)
//! - Fleet fan-out in bounded batches
//! - Resource exhaustion prediction
//! - Periodic detection service with explicit start/stop

mod orchestrator;
mod prediction;
mod service;


pub use orchestrator::{AnomalyDetector, DetectorSettings, DEFAULT_MONITORED_ITEMS};
pub use prediction::{
    is_utilization_key, predict_series, DEFAULT_RISK_THRESHOLD, PREDICTION_HORIZON_HOURS,
};
pub use service::DetectionService;
