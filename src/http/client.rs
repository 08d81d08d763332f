//! Risk service HTTP client
//!
//! Sends a batch of tests to the prioritization service and reads back the
//! ranked order.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::models::TestCase;

/// Risk service errors
#[derive(Error, Debug)]
pub enum RiskServiceError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Unexpected status code {0}")]
    Status(u16),

    #[error("Malformed ranking: {0}")]
    MalformedRanking(String),
}

/// Test item as exchanged with the risk service
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankingItem<'a> {
    id: &'a str,
    test_name: &'a str,
    file_path: &'a str,
    failure_rate: f64,
    execution_time: u64,
    risk_score: f64,
}

impl<'a> From<&'a TestCase> for RankingItem<'a> {
    fn from(test: &'a TestCase) -> Self {
        Self {
            id: &test.id,
            test_name: &test.test_name,
            file_path: &test.file_path,
            failure_rate: test.failure_rate(),
            execution_time: test.learning.last_execution_duration(),
            risk_score: test.priority(),
        }
    }
}

/// Entry of the ranked list returned by the service
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    #[serde(default)]
    pub id: Option<String>,
    pub test_name: String,
}

/// Client for the remote prioritization service
#[derive(Clone)]
pub struct RiskServiceClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl RiskServiceClient {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, RiskServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RiskServiceError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build full URL
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Ask the service to rank a batch of tests
    pub async fn prioritize(&self, tests: &[TestCase]) -> Result<Vec<RankedItem>, RiskServiceError> {
        let url = self.build_url("/prioritize");
        let payload: Vec<RankingItem<'_>> = tests.iter().map(RankingItem::from).collect();
        debug!("Sending {} tests to {}", payload.len(), url);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RiskServiceError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    RiskServiceError::ConnectionRefused(url.clone())
                } else {
                    RiskServiceError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskServiceError::Status(status.as_u16()));
        }

        let ranked: Vec<RankedItem> = response
            .json()
            .await
            .map_err(|e| RiskServiceError::MalformedRanking(e.to_string()))?;

        debug!(
            "Risk service ranked {} tests in {}ms",
            ranked.len(),
            start.elapsed().as_millis()
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let client = RiskServiceClient::new("http://localhost:8000/", 5).unwrap();
        assert_eq!(client.build_url("/prioritize"), "http://localhost:8000/prioritize");
    }

    #[test]
    fn test_ranking_item_payload() {
        let test = TestCase::new("Payment Gateway", "tests/payment.js", 9.2);
        let item = RankingItem::from(&test);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["testName"], "Payment Gateway");
        assert_eq!(json["riskScore"], 9.2);
        assert_eq!(json["failureRate"], 0.0);
    }

    #[test]
    fn test_ranked_item_without_id() {
        let items: Vec<RankedItem> =
            serde_json::from_str(r#"[{"testName": "a"}, {"id": "x", "testName": "b"}]"#).unwrap();
        assert!(items[0].id.is_none());
        assert_eq!(items[1].id.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let client = RiskServiceClient::new("http://127.0.0.1:9", 2).unwrap();
        let tests = vec![TestCase::new("a", "a.js", 1.0)];
        assert!(client.prioritize(&tests).await.is_err());
    }
}
