//! Persistence of baselines and detection results
//!
//! The engine talks to its key-value cache through the [`Cache`] trait so
//! the backing store (in-memory, Redis, ...) can be swapped at construction.

mod baseline_store;
mod memory;

pub use baseline_store::{BaselineStore, StoreTtls};
pub use memory::InMemoryCache;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value cache with per-entry expiry
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a value; expired or absent keys are a miss, not an error
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Drop expired entries that were never read back, returning how many.
    /// Stores with native expiry keep the default no-op.
    async fn evict_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

pub mod keys {
    /// Cache key of a metric baseline
    pub fn baseline(host_id: &str, item_key: &str) -> String {
        format!("baseline:{}:{}", host_id, item_key)
    }

    /// Cache key of a host's latest detection result
    pub fn scores(host_id: &str) -> String {
        format!("scores:{}", host_id)
    }

    /// Cache key of the latest fleet report
    pub const FLEET: &str = "fleet:latest";
}
