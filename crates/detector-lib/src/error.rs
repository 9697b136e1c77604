//! Error types for the detection engine

use thiserror::Error;

/// Errors raised while collecting metrics, learning baselines or persisting results
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Metric source unreachable, rejected the request or timed out
    #[error("metric source unavailable: {0}")]
    SourceUnavailable(String),

    /// Not enough samples to evaluate a metric
    #[error("insufficient data for {item_key}: {samples} samples, need {required}")]
    InsufficientData {
        item_key: String,
        samples: u64,
        required: u64,
    },

    /// Cache read/write or (de)serialization failure
    #[error("cache error: {0}")]
    CacheError(String),
}

impl From<serde_json::Error> for AnomalyError {
    fn from(e: serde_json::Error) -> Self {
        AnomalyError::CacheError(e.to_string())
    }
}

impl From<reqwest::Error> for AnomalyError {
    fn from(e: reqwest::Error) -> Self {
        AnomalyError::SourceUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnomalyError>;
