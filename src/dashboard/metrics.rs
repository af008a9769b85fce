use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::error::{ConsoleError, ConsoleErrorType, ConsoleResult, ErrorCode};
use crate::http::{ApiRequest, HttpClient, SimpleHttpResponse};
use crate::table::{CellValue, TableRow};

// Delays of 100ms, 200ms, 400ms... capped below.
const RETRY_FACTOR_MILLIS: u64 = 50;
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

/// Latency analysis as served by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub timestamp: String,
    #[serde(default)]
    pub latency_stats: BTreeMap<String, Value>,
    #[serde(default)]
    pub flow_stats: BTreeMap<String, Value>,
    #[serde(default)]
    pub anomaly_counts: BTreeMap<String, Value>,
}

/// The statistics maps of a [`MetricsResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSection {
    Latency,
    Flow,
    Anomalies,
}

impl FromStr for MetricSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latency" => Ok(MetricSection::Latency),
            "flow" => Ok(MetricSection::Flow),
            "anomalies" => Ok(MetricSection::Anomalies),
            other => Err(format!("unknown metric section '{}'", other)),
        }
    }
}

/// One statistic, shaped for the table view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: Value,
}

impl TableRow for MetricRow {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "metric" => CellValue::Text(self.metric.clone()),
            "value" => match &self.value {
                Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
                Value::Null => CellValue::Empty,
                Value::String(text) => CellValue::Text(text.clone()),
                other => CellValue::Text(other.to_string()),
            },
            _ => CellValue::Empty,
        }
    }
}

impl MetricsResponse {
    pub fn section(&self, section: MetricSection) -> &BTreeMap<String, Value> {
        match section {
            MetricSection::Latency => &self.latency_stats,
            MetricSection::Flow => &self.flow_stats,
            MetricSection::Anomalies => &self.anomaly_counts,
        }
    }

    /// Rows of one section, ordered by metric name
    pub fn rows(&self, section: MetricSection) -> Vec<MetricRow> {
        self.section(section)
            .iter()
            .map(|(metric, value)| MetricRow {
                metric: metric.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub last_analysis: Option<String>,
}

/// Path of one transaction through the monitored systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub transaction_id: String,
    pub flow_path: String,
    #[serde(default)]
    pub timestamps: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub latencies: BTreeMap<String, Option<f64>>,
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// A customer transaction, as listed on the transactions page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub ip_address: String,
    pub timestamp: String,
    pub status: bool,
    pub operation: String,
    pub account_type: String,
    pub amount: f64,
}

impl TableRow for Transaction {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "transaction_id" => CellValue::Text(self.transaction_id.clone()),
            "ip_address" => CellValue::Text(self.ip_address.clone()),
            "timestamp" => CellValue::Text(self.timestamp.clone()),
            "status" => CellValue::Bool(self.status),
            "operation" => CellValue::Text(self.operation.clone()),
            "account_type" => CellValue::Text(self.account_type.clone()),
            "amount" => CellValue::Number(self.amount),
            _ => CellValue::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTransactions {
    pub user_id: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRefresh {
    pub status: String,
}

/// Reads dashboard data from the analysis service.
///
/// Built over the authorized client, so every call carries the bearer token
/// when one is held.
pub struct DataService {
    client: Arc<dyn HttpClient>,
    base_url: String,
    retries: usize,
}

impl DataService {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>, retries: usize) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            retries,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL from path segments, each percent-encoded so ids cannot escape
    /// their segment
    fn segment_url(&self, segments: &[&str]) -> ConsoleResult<String> {
        let invalid = || {
            ConsoleError::from(ConsoleErrorType::Internal(format!(
                "metrics base URL {} cannot take a path",
                self.base_url
            )))
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// Latest latency metrics. Network failures and 5xx answers are retried
    /// with backoff; client errors are not.
    pub async fn latency_metrics(&self) -> ConsoleResult<MetricsResponse> {
        let url = self.url("/api/v1/metrics/latency");
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(RETRY_FACTOR_MILLIS)
            .max_delay(RETRY_MAX_DELAY)
            .map(jitter)
            .take(self.retries);

        RetryIf::spawn(
            strategy,
            || self.get_json::<MetricsResponse>(&url),
            |e: &ConsoleError| {
                let retry = e.is_retryable();
                if retry {
                    warn!(error = %e, "Metrics request failed, retrying");
                }
                retry
            },
        )
        .await
    }

    pub async fn health(&self) -> ConsoleResult<HealthStatus> {
        self.get_json(&self.url("/health")).await
    }

    /// Trace of one transaction; `None` when the service does not know it
    pub async fn transaction_trace(&self, transaction_id: &str) -> ConsoleResult<Option<TransactionTrace>> {
        let url = self.segment_url(&["transaction", transaction_id, "trace"])?;
        match self.get_json(&url).await {
            Ok(trace) => Ok(Some(trace)),
            Err(e) if e.code == ErrorCode::ApiNotFound => {
                debug!(transaction_id, "Transaction not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn user_transactions(&self, user_id: &str) -> ConsoleResult<UserTransactions> {
        let url = self.segment_url(&["users", user_id, "transactions"])?;
        self.get_json(&url).await
    }

    /// Ask the service to recompute its analysis in the background
    pub async fn request_analysis_refresh(&self) -> ConsoleResult<AnalysisRefresh> {
        let url = self.url("/analysis/refresh");
        let request = ApiRequest::post_json(&url, &serde_json::json!({})).map_err(|e| {
            ConsoleError::from(ConsoleErrorType::Internal(e.to_string()))
        })?;
        let response = self.send(request).await?;
        decode(&url, &response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ConsoleResult<T> {
        let response = self.send(ApiRequest::get(url)).await?;
        decode(url, &response)
    }

    async fn send(&self, request: ApiRequest) -> ConsoleResult<SimpleHttpResponse> {
        let url = request.url.clone();
        let response = self.client.execute(request).await.map_err(|e| {
            ConsoleError::from(ConsoleErrorType::NetworkFailure {
                url: url.clone(),
                reason: e.to_string(),
            })
        })?;

        match response.status() {
            404 => Err(ConsoleErrorType::ApiNotFound { url }.into()),
            status if !response.is_success() => {
                Err(ConsoleErrorType::ApiRequestFailed { url, status }.into())
            }
            _ => Ok(response),
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: &SimpleHttpResponse) -> ConsoleResult<T> {
    response.json().map_err(|e| {
        ConsoleErrorType::ApiResponseInvalid {
            url: url.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::http::mock::MockHttpClient;

    const METRICS: &str = "http://analysis.test/api/v1/metrics/latency";

    fn service(client: &MockHttpClient, retries: usize) -> DataService {
        DataService::new(Arc::new(client.clone()), "http://analysis.test/", retries)
    }

    fn metrics_body() -> &'static str {
        r#"{
            "timestamp": "2025-02-01T10:00:00",
            "latency_stats": {"p95_ms": 412.5, "mean_ms": 120.0},
            "flow_stats": {"completed": 980},
            "anomaly_counts": {"timeouts": 3}
        }"#
    }

    #[tokio::test]
    async fn metrics_are_decoded_into_rows() {
        let client = MockHttpClient::new();
        client.mock_response(METRICS, 200, metrics_body());

        let metrics = service(&client, 0).latency_metrics().await.unwrap();
        let rows = metrics.rows(MetricSection::Latency);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric, "mean_ms");
        assert_eq!(rows[1].cell("value"), CellValue::Number(412.5));
    }

    #[tokio::test]
    async fn network_failures_are_retried() {
        let client = MockHttpClient::new();
        client.queue_failure(METRICS, "connection reset");
        client.queue_response(METRICS, 200, metrics_body());

        let metrics = service(&client, 2).latency_metrics().await.unwrap();
        assert_eq!(metrics.anomaly_counts["timeouts"], 3);
        assert_eq!(client.requests_to(METRICS).len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let client = MockHttpClient::new();
        client.mock_response(METRICS, 401, "unauthorized");

        let err = service(&client, 3).latency_metrics().await.unwrap_err();
        assert_eq!(err.category, Some(ErrorCategory::Authentication));
        assert_eq!(client.requests_to(METRICS).len(), 1);
    }

    #[tokio::test]
    async fn unknown_transaction_is_none() {
        let client = MockHttpClient::new();
        client.mock_response("http://analysis.test/transaction/tx-9/trace", 404, "");

        let trace = service(&client, 0).transaction_trace("tx-9").await.unwrap();
        assert!(trace.is_none());
    }

    #[tokio::test]
    async fn ids_stay_inside_their_path_segment() {
        let client = MockHttpClient::new();
        let escaped = "http://analysis.test/users/a%2F..%2Fadmin%3Fx%23y/transactions";
        client.mock_response(escaped, 200, r#"{"user_id": "a/../admin?x#y"}"#);

        let listing = service(&client, 0)
            .user_transactions("a/../admin?x#y")
            .await
            .unwrap();

        assert_eq!(listing.user_id, "a/../admin?x#y");
        assert!(listing.transactions.is_empty());
        assert_eq!(client.requests_to(escaped).len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let client = MockHttpClient::new();
        client.mock_response("http://analysis.test/health", 200, "<html>");

        let err = service(&client, 0).health().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiResponseInvalid);
    }

    #[test]
    fn sections_parse_from_path_segments() {
        assert_eq!("flow".parse::<MetricSection>(), Ok(MetricSection::Flow));
        assert!("bogus".parse::<MetricSection>().is_err());
    }
}
