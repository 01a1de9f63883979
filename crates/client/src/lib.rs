//! HTTP client for the demand-forecast execution service.
//!
//! Wraps the service's REST API (multipart dataset submission, status
//! polling, cancellation, deletion, history, result download) using
//! [`reqwest`], plus the env-driven client configuration.

pub mod api;
pub mod config;

pub use api::{
    batch_result_filename, job_result_filename, ApiError, BatchOptions, BatchReceipt, ForecastApi,
    HealthReport, HistoryPage, PartitionStrategy, SubmitReceipt,
};
pub use config::ClientConfig;
