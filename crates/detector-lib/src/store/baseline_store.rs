//! Typed access to baselines and detection results
//!
//! Baseline updates are read-modify-write against the cache. Concurrent
//! updates of the same `(host, item)` key are serialized through a per-key
//! async mutex so that each learner run blends into the previous result
//! instead of overwriting it.

use super::{keys, Cache};
use crate::error::Result;
use crate::models::{AnomalyDetectionResult, FleetReport, MetricBaseline};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Expiry applied to each kind of cached record
#[derive(Debug, Clone, Copy)]
pub struct StoreTtls {
    pub baseline: Duration,
    pub result: Duration,
    pub fleet: Duration,
}

impl Default for StoreTtls {
    fn default() -> Self {
        Self {
            baseline: Duration::from_secs(60 * 60),
            result: Duration::from_secs(5 * 60),
            fleet: Duration::from_secs(5 * 60),
        }
    }
}

/// Baseline and result store on top of a [`Cache`]
#[derive(Clone)]
pub struct BaselineStore {
    cache: Arc<dyn Cache>,
    ttls: StoreTtls,
    key_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl BaselineStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_ttls(cache, StoreTtls::default())
    }

    pub fn with_ttls(cache: Arc<dyn Cache>, ttls: StoreTtls) -> Self {
        Self {
            cache,
            ttls,
            key_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn ttls(&self) -> StoreTtls {
        self.ttls
    }

    pub async fn load_baseline(&self, host_id: &str, item_key: &str) -> Result<Option<MetricBaseline>> {
        self.load(&keys::baseline(host_id, item_key)).await
    }

    pub async fn save_baseline(&self, baseline: &MetricBaseline) -> Result<()> {
        let key = keys::baseline(&baseline.host_id, &baseline.item_key);
        self.save(&key, baseline, self.ttls.baseline).await
    }

    /// Read the current baseline, pass it to `learn`, and persist the result,
    /// holding the key's lock for the whole sequence.
    pub async fn update_baseline<F>(
        &self,
        host_id: &str,
        item_key: &str,
        learn: F,
    ) -> Result<MetricBaseline>
    where
        F: FnOnce(Option<&MetricBaseline>) -> MetricBaseline,
    {
        let key = keys::baseline(host_id, item_key);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let existing: Option<MetricBaseline> = self.load(&key).await?;
        let updated = learn(existing.as_ref());
        self.save(&key, &updated, self.ttls.baseline).await?;

        debug!(
            host_id = %host_id,
            item_key = %item_key,
            sample_count = updated.sample_count,
            "Baseline updated"
        );
        Ok(updated)
    }

    pub async fn load_result(&self, host_id: &str) -> Result<Option<AnomalyDetectionResult>> {
        self.load(&keys::scores(host_id)).await
    }

    pub async fn save_result(&self, result: &AnomalyDetectionResult) -> Result<()> {
        self.save(&keys::scores(&result.host_id), result, self.ttls.result)
            .await
    }

    pub async fn load_fleet(&self) -> Result<Option<FleetReport>> {
        self.load(keys::FLEET).await
    }

    pub async fn save_fleet(&self, report: &FleetReport) -> Result<()> {
        self.save(keys::FLEET, report, self.ttls.fleet).await
    }

    /// Evict expired cache entries and drop key locks no update is holding
    pub async fn purge_expired(&self) -> Result<usize> {
        let evicted = self.cache.evict_expired().await?;
        self.key_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        if evicted > 0 {
            debug!(evicted = evicted, locks = self.key_locks.len(), "Purged expired records");
        }
        Ok(evicted)
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.cache.set(key, raw, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineLearner;
    use crate::config::HourClock;
    use crate::models::MetricDataPoint;
    use crate::store::InMemoryCache;

    fn store() -> BaselineStore {
        BaselineStore::new(Arc::new(InMemoryCache::new()))
    }

    #[tokio::test]
    async fn test_baseline_miss_is_none() {
        assert!(store().load_baseline("10084", "system.cpu.util").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_baseline() {
        let store = store();
        let learner = BaselineLearner::new(HourClock::Utc);
        let points = vec![MetricDataPoint::new(0, 10.0), MetricDataPoint::new(60, 30.0)];

        let updated = store
            .update_baseline("10084", "system.cpu.util", |existing| {
                learner.create_baseline("10084", "system.cpu.util", "CPU", &points, existing)
            })
            .await
            .unwrap();

        let loaded = store
            .load_baseline("10084", "system.cpu.util")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.sample_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_updates_compound() {
        let store = store();
        let learner = BaselineLearner::new(HourClock::Utc);

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let points = vec![MetricDataPoint::new(i * 60, i as f64)];
                store
                    .update_baseline("10084", "vm.memory.utilization", |existing| {
                        learner.create_baseline("10084", "vm.memory.utilization", "Memory", &points, existing)
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = store
            .load_baseline("10084", "vm.memory.utilization")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.sample_count, 10);
    }

    #[tokio::test]
    async fn test_purge_drops_expired_records_and_idle_locks() {
        let cache = Arc::new(InMemoryCache::new());
        let ttls = StoreTtls {
            baseline: Duration::from_millis(5),
            ..StoreTtls::default()
        };
        let store = BaselineStore::with_ttls(cache.clone(), ttls);
        let learner = BaselineLearner::new(HourClock::Utc);
        let points = vec![MetricDataPoint::new(0, 10.0)];

        for item in ["system.cpu.util", "vm.memory.utilization"] {
            store
                .update_baseline("10084", item, |existing| {
                    learner.create_baseline("10084", item, "metric", &points, existing)
                })
                .await
                .unwrap();
        }
        assert_eq!(store.key_locks.len(), 2);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert!(cache.is_empty());
        assert!(store.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_purge_keeps_held_lock() {
        let store = store();
        let held = store.key_lock("baseline:10084:system.cpu.util");
        let _guard = held.lock().await;

        store.purge_expired().await.unwrap();
        assert_eq!(store.key_locks.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_cache_error() {
        let cache = Arc::new(InMemoryCache::new());
        cache
            .set("baseline:1:cpu", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let store = BaselineStore::new(cache);

        let err = store.load_baseline("1", "cpu").await.unwrap_err();
        assert!(matches!(err, crate::error::AnomalyError::CacheError(_)));
    }
}
