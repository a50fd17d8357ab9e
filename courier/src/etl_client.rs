//! HTTP client for the ETL service.
//!
//! Three calls, three timeouts: health 5 s, trigger 30 s, status poll
//! 5 s. Transport failures map to the retryable `Network` error; the
//! queue layer handles backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::CourierError;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// `202` body of `POST /analyze/file`.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    pub job_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Body of `GET /analyze/status/{job_id}`. Statuses and phases stay as
/// wire strings here; the worker maps them onto its own job record.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlJobStatus {
    pub job_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub items_processed: u64,
    #[serde(default)]
    pub items_total: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Option<Value>,
}

impl EtlJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "completed" | "failed" | "completed_with_errors"
        )
    }

    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeFileRequest<'a> {
    file_url: &'a str,
    supplier_id: Uuid,
    file_type: &'a str,
    use_semantic_etl: bool,
}

#[derive(Clone)]
pub struct EtlClient {
    client: reqwest::Client,
    base_url: String,
}

impl EtlClient {
    pub fn new(base_url: String) -> Result<Self, CourierError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Reads `ML_ANALYZE_URL` (default `http://localhost:8100`).
    pub fn from_env() -> Result<Self, CourierError> {
        let base_url =
            std::env::var("ML_ANALYZE_URL").unwrap_or_else(|_| "http://localhost:8100".into());
        Self::new(base_url)
    }

    /// `GET /health`; any failure reads as unhealthy.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                let healthy = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("status").and_then(Value::as_str).map(String::from))
                    .map(|status| status == "healthy")
                    .unwrap_or(false);
                debug!(url, healthy, "ETL health check");
                healthy
            }
            Ok(response) => {
                warn!(url, status = %response.status(), "ETL health check failed");
                false
            }
            Err(err) => {
                warn!(url, error = %err, "ETL health check unreachable");
                false
            }
        }
    }

    /// `POST /analyze/file`; accepted work returns the ETL-side job id.
    pub async fn trigger_analysis(
        &self,
        file_url: &str,
        supplier_id: Uuid,
        file_type: &str,
    ) -> Result<TriggerResponse, CourierError> {
        let url = format!("{}/analyze/file", self.base_url);
        let body = AnalyzeFileRequest {
            file_url,
            supplier_id,
            file_type,
            use_semantic_etl: true,
        };

        let response = self
            .client
            .post(&url)
            .timeout(TRIGGER_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let snippet = response.text().await.unwrap_or_default();
            return Err(CourierError::HttpStatus {
                status,
                url,
                snippet: snippet.chars().take(200).collect(),
            });
        }

        let trigger: TriggerResponse = response
            .json()
            .await
            .map_err(|e| CourierError::Decode(e.to_string()))?;

        info!(
            etl_job_id = %trigger.job_id,
            supplier_id = %supplier_id,
            file_type,
            "ETL analysis triggered"
        );
        Ok(trigger)
    }

    /// `GET /analyze/status/{job_id}`.
    pub async fn job_status(&self, job_id: Uuid) -> Result<EtlJobStatus, CourierError> {
        let url = format!("{}/analyze/status/{}", self.base_url, job_id);

        let response = self.client.get(&url).timeout(POLL_TIMEOUT).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let snippet = response.text().await.unwrap_or_default();
            return Err(CourierError::HttpStatus {
                status,
                url,
                snippet: snippet.chars().take(200).collect(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CourierError::Decode(e.to_string()))
    }
}
