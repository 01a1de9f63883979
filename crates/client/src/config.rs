use std::time::Duration;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local forecast service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the forecast service (default: `http://localhost:9571`).
    pub base_url: String,
    /// Per-request timeout in seconds (default: `30`).  Applies to the
    /// top-level HTTP call only; timeouts surface as transport errors.
    pub request_timeout_secs: u64,
    /// Interval between single-job status polls in milliseconds
    /// (default: `2000`).
    pub job_poll_interval_ms: u64,
    /// Interval between batch status polls in milliseconds (default:
    /// `5000`).  Batch status changes less often per unit of work, so it
    /// is polled more slowly than single jobs.
    pub batch_poll_interval_ms: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                 |
    /// |-----------------------------------|-------------------------|
    /// | `FORECAST_API_URL`                | `http://localhost:9571` |
    /// | `FORECAST_REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `FORECAST_JOB_POLL_INTERVAL_MS`   | `2000`                  |
    /// | `FORECAST_BATCH_POLL_INTERVAL_MS` | `5000`                  |
    pub fn from_env() -> Self {
        let base_url = std::env::var("FORECAST_API_URL")
            .unwrap_or_else(|_| "http://localhost:9571".into());

        let request_timeout_secs: u64 = std::env::var("FORECAST_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("FORECAST_REQUEST_TIMEOUT_SECS must be a valid u64");

        let job_poll_interval_ms: u64 = std::env::var("FORECAST_JOB_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("FORECAST_JOB_POLL_INTERVAL_MS must be a valid u64");

        let batch_poll_interval_ms: u64 = std::env::var("FORECAST_BATCH_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("FORECAST_BATCH_POLL_INTERVAL_MS must be a valid u64");

        Self {
            base_url,
            request_timeout_secs,
            job_poll_interval_ms,
            batch_poll_interval_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_ms)
    }

    pub fn batch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.batch_poll_interval_ms)
    }
}
