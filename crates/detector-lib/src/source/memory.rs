//! Static metric source

use super::MetricSource;
use crate::error::{AnomalyError, Result};
use crate::models::{HostInfo, MetricSeries};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Metric source serving a fixed set of hosts and series.
///
/// Hosts can be configured to fail or respond slowly to exercise the
/// detector's partial-failure and timeout handling.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    hosts: Vec<HostInfo>,
    series: HashMap<String, Vec<MetricSeries>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host_id: impl Into<String>, host_name: impl Into<String>) -> Self {
        self.hosts.push(HostInfo::new(host_id, host_name));
        self
    }

    pub fn with_series(mut self, host_id: impl Into<String>, series: MetricSeries) -> Self {
        self.series.entry(host_id.into()).or_default().push(series);
        self
    }

    /// Make history requests for this host fail
    pub fn with_failure(mut self, host_id: impl Into<String>) -> Self {
        self.failing.insert(host_id.into());
        self
    }

    /// Delay history requests for this host
    pub fn with_delay(mut self, host_id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(host_id.into(), delay);
        self
    }
}

#[async_trait]
impl MetricSource for InMemorySource {
    async fn list_enabled_hosts(&self) -> Result<Vec<HostInfo>> {
        Ok(self.hosts.clone())
    }

    async fn get_host(&self, host_id: &str) -> Result<Option<HostInfo>> {
        Ok(self.hosts.iter().find(|h| h.host_id == host_id).cloned())
    }

    async fn get_history(
        &self,
        host_id: &str,
        item_keys: &[String],
        time_from: i64,
    ) -> Result<Vec<MetricSeries>> {
        if let Some(delay) = self.delays.get(host_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(host_id) {
            return Err(AnomalyError::SourceUnavailable(format!(
                "history unavailable for host {}",
                host_id
            )));
        }

        let series = self
            .series
            .get(host_id)
            .map(|all| {
                all.iter()
                    .filter(|s| item_keys.is_empty() || item_keys.contains(&s.item_key))
                    .map(|s| MetricSeries {
                        history: s
                            .history
                            .iter()
                            .filter(|p| p.timestamp >= time_from)
                            .copied()
                            .collect(),
                        ..s.clone()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(series)
    }
}
