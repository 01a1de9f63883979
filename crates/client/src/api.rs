//! REST API client for the forecast service endpoints.
//!
//! Wraps dataset submission (single and batch), status retrieval,
//! cancellation, deletion, history, and result download using
//! [`reqwest`].  All methods are one request, one response; retry and
//! polling policy live in the session layer.

use std::path::Path;

use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use demandcast_core::batch::{BatchAnalysis, BatchJobRecord};
use demandcast_core::config::ForecastConfig;
use demandcast_core::job::JobRecord;
use demandcast_core::status::{BatchStatus, JobStatus};
use demandcast_core::types::{JobId, Timestamp};

use crate::config::ClientConfig;

/// HTTP client for a single forecast service.
pub struct ForecastApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned after successfully queueing a single job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    /// Remote task identifier used for all subsequent status polls.
    pub task_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Response returned after successfully queueing a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchReceipt {
    pub batch_id: String,
    pub batch_job_id: JobId,
    pub task_id: String,
    pub status: BatchStatus,
    pub message: String,
    pub analysis: BatchAnalysis,
}

/// How the server splits a batch's input into partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionStrategy {
    /// One partition per site group.
    #[default]
    Site,
    /// Server-chosen split by size.
    Auto,
}

impl PartitionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Auto => "auto",
        }
    }
}

/// Batch submission tuning knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub partition_strategy: PartitionStrategy,
    pub max_rows_per_partition: u32,
    /// Server-enforced per-partition execution timeout in seconds.
    pub partition_timeout_seconds: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            partition_strategy: PartitionStrategy::Site,
            max_rows_per_partition: 2000,
            partition_timeout_seconds: 300,
        }
    }
}

/// One page of job history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub jobs: Vec<JobRecord>,
}

/// Service health probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: Option<Timestamp>,
    pub database: String,
    pub celery: String,
    pub version: String,
}

/// Errors from the forecast REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout) or
    /// the response body failed to parse.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Forecast API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Writing a downloaded result to disk failed.
    #[error("I/O error writing result: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether this is the service rejecting the request as invalid for
    /// the resource's current state (HTTP 400), e.g. cancelling a job
    /// that is no longer running.
    pub fn is_state_rejection(&self) -> bool {
        matches!(self, Self::Api { status: 400, .. })
    }
}

/// Default client-side filename for a single-job result.
pub fn job_result_filename(job_id: JobId) -> String {
    format!("forecast_result_{job_id}.csv")
}

/// Default client-side filename for a batch result.
pub fn batch_result_filename(batch_id: &str) -> String {
    format!("batch_forecast_{batch_id}.csv")
}

impl ForecastApi {
    /// Create a new API client for a forecast service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:9571`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Build a client from [`ClientConfig`], applying the configured
    /// per-request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Submit a dataset for a single forecast job.
    ///
    /// Sends a multipart `POST /api/forecast/submit` with the CSV bytes
    /// and the JSON-encoded config.  Returns the server-assigned job and
    /// task identifiers.
    pub async fn submit_job(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
    ) -> Result<SubmitReceipt, ApiError> {
        let submission_id = uuid::Uuid::new_v4();
        let form = Self::dataset_form(file_name, data, config)?;

        let response = self
            .client
            .post(format!("{}/api/forecast/submit", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let receipt: SubmitReceipt = Self::parse_response(response).await?;

        tracing::info!(
            submission_id = %submission_id,
            job_id = receipt.job_id,
            task_id = %receipt.task_id,
            file_name,
            "Forecast job submitted",
        );

        Ok(receipt)
    }

    /// Submit a dataset for batch forecasting with auto-partitioning.
    ///
    /// Sends a multipart `POST /api/batch/submit`; partition tuning knobs
    /// travel as extra form fields.  Returns the batch identifier and the
    /// server's partition-planning analysis.
    pub async fn submit_batch(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
        options: &BatchOptions,
    ) -> Result<BatchReceipt, ApiError> {
        let submission_id = uuid::Uuid::new_v4();
        let form = Self::dataset_form(file_name, data, config)?
            .text("partition_strategy", options.partition_strategy.as_str())
            .text(
                "max_rows_per_partition",
                options.max_rows_per_partition.to_string(),
            )
            .text(
                "max_execution_time",
                options.partition_timeout_seconds.to_string(),
            );

        let response = self
            .client
            .post(format!("{}/api/batch/submit", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let receipt: BatchReceipt = Self::parse_response(response).await?;

        tracing::info!(
            submission_id = %submission_id,
            batch_id = %receipt.batch_id,
            total_partitions = receipt.analysis.total_partitions,
            file_name,
            "Batch forecast submitted",
        );

        Ok(receipt)
    }

    /// Fetch single-job status by remote task ID.
    pub async fn job_status(&self, task_id: &str) -> Result<JobRecord, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/forecast/status/{}", self.api_url, task_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch single-job status by job ID.
    pub async fn job_status_by_id(&self, job_id: JobId) -> Result<JobRecord, ApiError> {
        let response = self
            .client
            .get(format!(
                "{}/api/forecast/status/job/{}",
                self.api_url, job_id
            ))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch batch status with per-partition detail.
    pub async fn batch_status(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/batch/status/{}", self.api_url, batch_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Cancel a queued or running job.  Returns the updated record.
    ///
    /// The service rejects cancellation of terminal jobs with HTTP 400;
    /// see [`ApiError::is_state_rejection`].
    pub async fn cancel_job(&self, job_id: JobId) -> Result<JobRecord, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/forecast/cancel/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Cancel a queued or running batch.  Returns the updated record.
    pub async fn cancel_batch(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/batch/cancel/{}", self.api_url, batch_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Delete a job server-side.  Without `force`, the service rejects
    /// deleting a job that is still QUEUED/PROCESSING.
    pub async fn delete_job(&self, job_id: JobId, force: bool) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/api/forecast/{}", self.api_url, job_id))
            .query(&[("force", force)])
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Fetch one page of job history, optionally filtered by status.
    pub async fn history(
        &self,
        page: u32,
        page_size: u32,
        status: Option<JobStatus>,
    ) -> Result<HistoryPage, ApiError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/forecast/history", self.api_url))
            .query(&query)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Probe service health.
    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/health", self.api_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a single-job result to `dest`, streaming the body.
    /// Returns the number of bytes written.
    pub async fn download_job(&self, job_id: JobId, dest: &Path) -> Result<u64, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/forecast/download/{}", self.api_url, job_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Self::stream_to_file(response, dest).await
    }

    /// Download a combined batch result to `dest`, streaming the body.
    pub async fn download_batch(&self, batch_id: &str, dest: &Path) -> Result<u64, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/batch/download/{}", self.api_url, batch_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Self::stream_to_file(response, dest).await
    }

    // ---- private helpers ----

    /// Build the shared multipart form: CSV bytes plus JSON config.
    fn dataset_form(
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
    ) -> Result<reqwest::multipart::Form, ApiError> {
        let config_json =
            serde_json::to_string(config).expect("ForecastConfig is always serialisable");

        let file_part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;

        Ok(reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("config", config_json))
    }

    /// Stream a response body into a file, returning the byte count.
    async fn stream_to_file(response: reqwest::Response, dest: &Path) -> Result<u64, ApiError> {
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    /// Ensure the response has a success status code.  Returns the
    /// response unchanged on success, or an [`ApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
