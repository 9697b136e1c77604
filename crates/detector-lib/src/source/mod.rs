//! Metric sources
//!
//! This module provides:
//! - The [`MetricSource`] trait consumed by the detector
//! - A Zabbix JSON-RPC implementation
//! - A static in-memory implementation for tests and replay

mod memory;
mod zabbix;

pub use memory::InMemorySource;
pub use zabbix::{ZabbixConfig, ZabbixSource};

use crate::error::Result;
use crate::models::{HostInfo, MetricSeries};
use async_trait::async_trait;

/// Supplier of monitored hosts and their metric history
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// List all hosts with monitoring enabled
    async fn list_enabled_hosts(&self) -> Result<Vec<HostInfo>>;

    /// Look up a single host by id
    async fn get_host(&self, host_id: &str) -> Result<Option<HostInfo>>;

    /// Fetch history since `time_from` (unix seconds) for the given item keys.
    ///
    /// Items whose history cannot be fetched are left out rather than failing
    /// the whole call.
    async fn get_history(
        &self,
        host_id: &str,
        item_keys: &[String],
        time_from: i64,
    ) -> Result<Vec<MetricSeries>>;
}
