//! API client for the anomaly detector service

use anyhow::{Context, Result};
use detector_lib::{
    AnomalyDetectionResult, AnomalySummary, FleetReport, HealthResponse, ReadinessResponse,
    TrendPrediction,
};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// API client for the detector service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// GET a probe endpoint whose body is meaningful for any status
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn anomalies(&self) -> Result<Vec<AnomalyDetectionResult>> {
        self.get("api/v1/anomalies").await
    }

    pub async fn summary(&self) -> Result<AnomalySummary> {
        self.get("api/v1/summary").await
    }

    pub async fn host(&self, host_id: &str) -> Result<AnomalyDetectionResult> {
        self.get(&format!("api/v1/hosts/{}", host_id)).await
    }

    pub async fn predictions(&self, host_id: &str, threshold: f64) -> Result<Vec<TrendPrediction>> {
        self.get(&format!(
            "api/v1/hosts/{}/predictions?threshold={}",
            host_id, threshold
        ))
        .await
    }

    pub async fn detect(&self) -> Result<FleetReport> {
        self.post("api/v1/detect", &serde_json::json!({})).await
    }

    pub async fn health(&self) -> Result<(u16, HealthResponse)> {
        self.probe("healthz").await
    }

    pub async fn readiness(&self) -> Result<(u16, ReadinessResponse)> {
        self.probe("readyz").await
    }
}
