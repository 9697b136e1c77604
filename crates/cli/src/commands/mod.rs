//! CLI command implementations

pub mod anomalies;
pub mod predictions;
pub mod status;
