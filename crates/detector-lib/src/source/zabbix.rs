//! Zabbix JSON-RPC metric source
//!
//! Uses `host.get` for discovery, `item.get` to resolve item keys and
//! `history.get` per numeric item. A failing `history.get` drops only that
//! item from the result.

use super::MetricSource;
use crate::error::{AnomalyError, Result};
use crate::models::{HostInfo, MetricDataPoint, MetricSeries};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Zabbix item value types holding numbers (float, unsigned)
const NUMERIC_VALUE_TYPES: &[&str] = &["0", "3"];

/// Connection settings for the Zabbix API
#[derive(Debug, Clone)]
pub struct ZabbixConfig {
    /// Full JSON-RPC endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`
    pub url: String,
    /// API token sent as a bearer credential
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ZabbixConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost/zabbix/api_jsonrpc.php".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZabbixHost {
    hostid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ZabbixItem {
    itemid: String,
    key_: String,
    name: String,
    #[serde(default)]
    lastvalue: Option<String>,
    value_type: String,
}

#[derive(Debug, Deserialize)]
struct ZabbixHistory {
    clock: String,
    value: String,
}

/// Metric source backed by the Zabbix API
pub struct ZabbixSource {
    client: Client,
    endpoint: Url,
    api_token: Option<String>,
    request_id: AtomicU64,
}

impl ZabbixSource {
    pub fn new(config: ZabbixConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            AnomalyError::SourceUnavailable(format!("invalid Zabbix URL {}: {}", config.url, e))
        })?;
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_token: config.api_token,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AnomalyError::SourceUnavailable(format!(
                "{} failed with HTTP {}: {}",
                method, status, text
            )));
        }

        let envelope: RpcResponse<T> = response.json().await?;
        match (envelope.result, envelope.error) {
            (_, Some(err)) => Err(AnomalyError::SourceUnavailable(format!(
                "{} failed ({}): {} {}",
                method,
                err.code,
                err.message,
                err.data.unwrap_or_default()
            ))),
            (Some(result), None) => Ok(result),
            (None, None) => Err(AnomalyError::SourceUnavailable(format!(
                "{} returned neither result nor error",
                method
            ))),
        }
    }

    async fn fetch_item_history(&self, item: &ZabbixItem, time_from: i64) -> Result<Vec<MetricDataPoint>> {
        let value_type: u8 = item.value_type.parse().unwrap_or(0);
        let rows: Vec<ZabbixHistory> = self
            .call(
                "history.get",
                json!({
                    "output": ["clock", "value"],
                    "history": value_type,
                    "itemids": [item.itemid],
                    "time_from": time_from,
                    "sortfield": "clock",
                    "sortorder": "ASC",
                }),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(MetricDataPoint::new(
                    row.clock.parse().ok()?,
                    row.value.parse().ok()?,
                ))
            })
            .collect())
    }
}

#[async_trait]
impl MetricSource for ZabbixSource {
    async fn list_enabled_hosts(&self) -> Result<Vec<HostInfo>> {
        let hosts: Vec<ZabbixHost> = self
            .call(
                "host.get",
                json!({
                    "output": ["hostid", "name"],
                    "filter": { "status": "0" },
                }),
            )
            .await?;
        Ok(hosts
            .into_iter()
            .map(|h| HostInfo::new(h.hostid, h.name))
            .collect())
    }

    async fn get_host(&self, host_id: &str) -> Result<Option<HostInfo>> {
        let hosts: Vec<ZabbixHost> = self
            .call(
                "host.get",
                json!({
                    "output": ["hostid", "name"],
                    "hostids": [host_id],
                }),
            )
            .await?;
        Ok(hosts
            .into_iter()
            .next()
            .map(|h| HostInfo::new(h.hostid, h.name)))
    }

    async fn get_history(
        &self,
        host_id: &str,
        item_keys: &[String],
        time_from: i64,
    ) -> Result<Vec<MetricSeries>> {
        let mut params = json!({
            "output": ["itemid", "key_", "name", "lastvalue", "value_type"],
            "hostids": [host_id],
            "monitored": true,
        });
        if !item_keys.is_empty() {
            params["filter"] = json!({ "key_": item_keys });
        }
        let items: Vec<ZabbixItem> = self.call("item.get", params).await?;

        let mut series = Vec::with_capacity(items.len());
        for item in items {
            if !NUMERIC_VALUE_TYPES.contains(&item.value_type.as_str()) {
                debug!(host_id = %host_id, item_key = %item.key_, "Skipping non-numeric item");
                continue;
            }

            let history = match self.fetch_item_history(&item, time_from).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(
                        host_id = %host_id,
                        item_key = %item.key_,
                        error = %e,
                        "History fetch failed, skipping item"
                    );
                    continue;
                }
            };

            series.push(MetricSeries {
                last_value: item.lastvalue.as_deref().and_then(|v| v.parse().ok()),
                item_key: item.key_,
                item_name: item.name,
                history,
            });
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn source_for(server: &mockito::ServerGuard, token: Option<&str>) -> ZabbixSource {
        ZabbixSource::new(ZabbixConfig {
            url: format!("{}/api_jsonrpc.php", server.url()),
            api_token: token.map(str::to_string),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_enabled_hosts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api_jsonrpc.php")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "method": "host.get",
                "params": { "filter": { "status": "0" } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","result":[{"hostid":"10084","name":"web-01"},{"hostid":"10085","name":"db-01"}],"id":1}"#)
            .create_async()
            .await;

        let source = source_for(&server, Some("secret")).await;
        let hosts = source.list_enabled_hosts().await.unwrap();

        mock.assert_async().await;
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0], HostInfo::new("10084", "web-01"));
    }

    #[tokio::test]
    async fn test_rpc_error_is_source_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api_jsonrpc.php")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params.","data":"Not authorised."},"id":1}"#)
            .create_async()
            .await;

        let source = source_for(&server, None).await;
        let err = source.list_enabled_hosts().await.unwrap_err();
        assert!(matches!(err, AnomalyError::SourceUnavailable(ref m) if m.contains("Not authorised")));
    }

    #[tokio::test]
    async fn test_http_error_is_source_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api_jsonrpc.php")
            .with_status(502)
            .create_async()
            .await;

        let source = source_for(&server, None).await;
        assert!(matches!(
            source.get_host("10084").await,
            Err(AnomalyError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_history_skips_failed_and_non_numeric_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(Matcher::PartialJson(json!({ "method": "item.get" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","result":[
                    {"itemid":"1","key_":"system.cpu.util","name":"CPU utilization","lastvalue":"42.5","value_type":"0"},
                    {"itemid":"2","key_":"vm.memory.utilization","name":"Memory utilization","lastvalue":"70","value_type":"0"},
                    {"itemid":"3","key_":"system.uname","name":"System name","lastvalue":"Linux","value_type":"4"}
                ],"id":1}"#,
            )
            .create_async()
            .await;
        server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(Matcher::PartialJson(json!({
                "method": "history.get",
                "params": { "itemids": ["1"] }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","result":[{"clock":"1704067200","value":"40.0"},{"clock":"1704067260","value":"bad"},{"clock":"1704067320","value":"42.5"}],"id":2}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(Matcher::PartialJson(json!({
                "method": "history.get",
                "params": { "itemids": ["2"] }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","error":{"code":-32500,"message":"Application error."},"id":3}"#)
            .create_async()
            .await;

        let source = source_for(&server, None).await;
        let keys = vec![
            "system.cpu.util".to_string(),
            "vm.memory.utilization".to_string(),
            "system.uname".to_string(),
        ];
        let series = source.get_history("10084", &keys, 1_704_000_000).await.unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].item_key, "system.cpu.util");
        assert_eq!(series[0].last_value, Some(42.5));
        assert_eq!(series[0].history.len(), 2);
        assert_eq!(series[0].history[1], MetricDataPoint::new(1_704_067_320, 42.5));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = ZabbixSource::new(ZabbixConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(AnomalyError::SourceUnavailable(_))));
    }
}
