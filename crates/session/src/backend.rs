//! Seam between the lifecycle core and the HTTP client.
//!
//! The controller and poller talk to the service through this trait so
//! tests can drive the full lifecycle with a scripted backend and
//! simulated time instead of a live service.

use std::path::Path;

use async_trait::async_trait;

use demandcast_client::{ApiError, BatchOptions, BatchReceipt, ForecastApi, SubmitReceipt};
use demandcast_core::batch::BatchJobRecord;
use demandcast_core::config::ForecastConfig;
use demandcast_core::job::JobRecord;
use demandcast_core::types::JobId;

/// Operations the lifecycle core needs from the forecast service.
#[async_trait]
pub trait ForecastBackend: Send + Sync {
    async fn submit_job(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
    ) -> Result<SubmitReceipt, ApiError>;

    async fn submit_batch(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
        options: &BatchOptions,
    ) -> Result<BatchReceipt, ApiError>;

    async fn job_status(&self, task_id: &str) -> Result<JobRecord, ApiError>;

    async fn batch_status(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError>;

    async fn cancel_job(&self, job_id: JobId) -> Result<JobRecord, ApiError>;

    async fn cancel_batch(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError>;

    async fn download_job(&self, job_id: JobId, dest: &Path) -> Result<u64, ApiError>;

    async fn download_batch(&self, batch_id: &str, dest: &Path) -> Result<u64, ApiError>;
}

#[async_trait]
impl ForecastBackend for ForecastApi {
    async fn submit_job(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
    ) -> Result<SubmitReceipt, ApiError> {
        ForecastApi::submit_job(self, file_name, data, config).await
    }

    async fn submit_batch(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: &ForecastConfig,
        options: &BatchOptions,
    ) -> Result<BatchReceipt, ApiError> {
        ForecastApi::submit_batch(self, file_name, data, config, options).await
    }

    async fn job_status(&self, task_id: &str) -> Result<JobRecord, ApiError> {
        ForecastApi::job_status(self, task_id).await
    }

    async fn batch_status(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError> {
        ForecastApi::batch_status(self, batch_id).await
    }

    async fn cancel_job(&self, job_id: JobId) -> Result<JobRecord, ApiError> {
        ForecastApi::cancel_job(self, job_id).await
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<BatchJobRecord, ApiError> {
        ForecastApi::cancel_batch(self, batch_id).await
    }

    async fn download_job(&self, job_id: JobId, dest: &Path) -> Result<u64, ApiError> {
        ForecastApi::download_job(self, job_id, dest).await
    }

    async fn download_batch(&self, batch_id: &str, dest: &Path) -> Result<u64, ApiError> {
        ForecastApi::download_batch(self, batch_id, dest).await
    }
}
