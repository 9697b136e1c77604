//! Component health tracking for the detection service
//!
//! Backs the `/healthz` and `/readyz` endpoints. A degraded component keeps
//! the service live and ready; an unhealthy one fails readiness.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component names reported by the detection service
pub mod components {
    pub const METRIC_SOURCE: &str = "metric_source";
    pub const BASELINE_STORE: &str = "baseline_store";
    pub const DETECTOR: &str = "detector";
}

/// Ordered from best to worst, so the fleet status is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Healthy and degraded components still serve requests
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Last reported state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last report
    pub checked_at: i64,
    /// Reports in a row that were not healthy
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl ComponentHealth {
    fn report(status: ComponentStatus, message: Option<String>, previous: Option<&Self>) -> Self {
        let consecutive_failures = match (status, previous) {
            (ComponentStatus::Healthy, _) => 0,
            (_, Some(prev)) => prev.consecutive_failures.saturating_add(1),
            (_, None) => 1,
        };
        Self {
            status,
            message,
            checked_at: chrono::Utc::now().timestamp(),
            consecutive_failures,
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
}

impl HealthState {
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Shared view of component health; clones point at the same state.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `name` as healthy
    pub async fn register(&self, name: &str) {
        self.record(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        self.record(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.record(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.record(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    async fn record(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        let next = ComponentHealth::report(status, message, state.components.get(name));
        state.components.insert(name.to_string(), next);
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
        }
    }

    /// Status of a single component, if registered
    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.state.read().await.components.get(name).cloned()
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        if !state.ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Detector not yet initialized".to_string()),
            };
        }

        let mut failing: Vec<&str> = state
            .components
            .iter()
            .filter(|(_, c)| !c.status.is_operational())
            .map(|(name, _)| name.as_str())
            .collect();
        if failing.is_empty() {
            return ReadinessResponse {
                ready: true,
                reason: None,
            };
        }

        failing.sort_unstable();
        ReadinessResponse {
            ready: false,
            reason: Some(format!("Unhealthy components: {}", failing.join(", "))),
        }
    }
}
