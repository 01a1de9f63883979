//! Session controller: submission, cancellation, reset, and result
//! retrieval for the single active job or batch.
//!
//! Submission and cancellation hold the same lock, so user actions are
//! serialized against each other; the poller task is the only concurrent
//! writer and the store's merge rules resolve that race (see
//! [`crate::state`]).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

use demandcast_client::{BatchOptions, BatchReceipt, ClientConfig, SubmitReceipt};
use demandcast_core::aggregate;
use demandcast_core::batch::BatchJobRecord;
use demandcast_core::config::ForecastConfig;
use demandcast_core::job::JobRecord;
use demandcast_core::status::{BatchStatus, JobStatus};

use crate::backend::ForecastBackend;
use crate::error::SessionError;
use crate::events::{SessionEvent, EVENT_CHANNEL_CAPACITY};
use crate::poller::{spawn_poller, PollTarget, PollerHandle};
use crate::state::{SessionState, SessionStore};

/// Upload size cap, matching the service's 50 MB limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Poll intervals per mode.  Single jobs are polled faster than batches
/// because their status changes more often per unit of work.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub job: Duration,
    pub batch: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            job: Duration::from_millis(2000),
            batch: Duration::from_millis(5000),
        }
    }
}

impl PollIntervals {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            job: config.job_poll_interval(),
            batch: config.batch_poll_interval(),
        }
    }
}

/// The authoritative post-cancel record.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Job(JobRecord),
    Batch(BatchJobRecord),
}

/// Orchestrates one session's job/batch lifecycle.
pub struct SessionController {
    backend: Arc<dyn ForecastBackend>,
    store: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    intervals: PollIntervals,
    /// The single active poller, if any.  Also serves as the lock that
    /// serializes submission and cancellation.
    poller: Mutex<Option<PollerHandle>>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn ForecastBackend>, intervals: PollIntervals) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            store: Arc::new(SessionStore::new()),
            events,
            intervals,
            poller: Mutex::new(None),
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current session state snapshot.
    pub async fn state(&self) -> SessionState {
        self.store.snapshot().await
    }

    /// Submit a dataset as a single forecast job and start polling.
    ///
    /// On failure the session stays idle; there is no automatic retry.
    /// The error is surfaced once and the user resubmits.
    pub async fn submit_job(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: ForecastConfig,
    ) -> Result<SubmitReceipt, SessionError> {
        let mut poller = self.poller.lock().await;
        self.ensure_idle().await?;
        validate_dataset(file_name, &data)?;
        config.check()?;
        let config = config.normalized();

        let receipt = self.backend.submit_job(file_name, data, &config).await?;

        self.store
            .begin_job(receipt.job_id, receipt.task_id.clone())
            .await?;

        *poller = Some(spawn_poller(
            Arc::clone(&self.backend),
            Arc::clone(&self.store),
            self.events.clone(),
            PollTarget::Job {
                task_id: receipt.task_id.clone(),
            },
            self.intervals.job,
        ));

        let _ = self.events.send(SessionEvent::JobSubmitted {
            job_id: receipt.job_id,
            task_id: receipt.task_id.clone(),
        });

        Ok(receipt)
    }

    /// Submit a dataset as a batch and start polling.
    ///
    /// Batch mode ignores any site-code filter server-side; a configured
    /// filter is surfaced as a warning rather than silently dropped, and
    /// the config is transmitted unmodified.
    pub async fn submit_batch(
        &self,
        file_name: &str,
        data: Vec<u8>,
        config: ForecastConfig,
        options: BatchOptions,
    ) -> Result<BatchReceipt, SessionError> {
        let mut poller = self.poller.lock().await;
        self.ensure_idle().await?;
        validate_dataset(file_name, &data)?;
        config.check()?;
        let config = config.normalized();

        if config.has_site_filter() {
            let message =
                "batch mode ignores the site-code filter; all sites will be forecast".to_string();
            tracing::warn!("{message}");
            let _ = self.events.send(SessionEvent::Warning { message });
        }

        let receipt = self
            .backend
            .submit_batch(file_name, data, &config, &options)
            .await?;

        self.store
            .begin_batch(receipt.batch_id.clone(), receipt.analysis.clone())
            .await?;

        *poller = Some(spawn_poller(
            Arc::clone(&self.backend),
            Arc::clone(&self.store),
            self.events.clone(),
            PollTarget::Batch {
                batch_id: receipt.batch_id.clone(),
            },
            self.intervals.batch,
        ));

        let _ = self.events.send(SessionEvent::BatchSubmitted {
            batch_id: receipt.batch_id.clone(),
            total_partitions: receipt.analysis.total_partitions,
        });

        Ok(receipt)
    }

    /// Cancel the active job or batch.
    ///
    /// Does not abort the poller's in-flight request: the cancel call is
    /// issued, then a fresh status fetch is installed as the
    /// authoritative post-cancel state.  The poller stops on its own once
    /// it observes the terminal status.  A cancel that races a cancel
    /// already processed server-side (HTTP 400, "not running") is a
    /// benign no-op; the state is simply refreshed.
    pub async fn cancel(&self) -> Result<CancelOutcome, SessionError> {
        let _poller = self.poller.lock().await;

        match self.store.snapshot().await {
            SessionState::Idle => Err(SessionError::Precondition(
                "no active job or batch to cancel".into(),
            )),

            SessionState::Job(session) => {
                if let Some(last) = &session.last {
                    if last.status.is_terminal() {
                        return Err(SessionError::Precondition(format!(
                            "cannot cancel job with status: {}",
                            last.status.as_str()
                        )));
                    }
                }

                match self.backend.cancel_job(session.job_id).await {
                    Ok(_) => {}
                    Err(e) if e.is_state_rejection() => {
                        tracing::debug!(
                            job_id = session.job_id,
                            error = %e,
                            "Cancel rejected server-side; refreshing state",
                        );
                    }
                    Err(e) => return Err(e.into()),
                }

                let record = self.backend.job_status(&session.task_id).await?;
                let record = self
                    .store
                    .install_job(record)
                    .await
                    .ok_or_else(stale_session)?;

                tracing::info!(
                    job_id = record.job_id,
                    status = record.status.as_str(),
                    "Post-cancel state installed",
                );
                let _ = self.events.send(SessionEvent::JobUpdated(record.clone()));
                let _ = self.events.send(SessionEvent::JobCancelled {
                    job_id: record.job_id,
                });

                Ok(CancelOutcome::Job(record))
            }

            SessionState::Batch(session) => {
                if let Some(last) = &session.last {
                    if last.status.is_terminal() {
                        return Err(SessionError::Precondition(format!(
                            "cannot cancel batch with status: {}",
                            last.status.as_str()
                        )));
                    }
                }

                match self.backend.cancel_batch(&session.batch_id).await {
                    Ok(_) => {}
                    Err(e) if e.is_state_rejection() => {
                        tracing::debug!(
                            batch_id = %session.batch_id,
                            error = %e,
                            "Cancel rejected server-side; refreshing state",
                        );
                    }
                    Err(e) => return Err(e.into()),
                }

                let record = self.backend.batch_status(&session.batch_id).await?;
                let record = self
                    .store
                    .install_batch(record)
                    .await
                    .ok_or_else(stale_session)?;

                tracing::info!(
                    batch_id = %record.batch_id,
                    status = record.status.as_str(),
                    "Post-cancel state installed",
                );
                let _ = self
                    .events
                    .send(SessionEvent::BatchUpdated(record.clone()));
                let _ = self.events.send(SessionEvent::BatchCancelled {
                    batch_id: record.batch_id.clone(),
                });

                Ok(CancelOutcome::Batch(record))
            }
        }
    }

    /// Stop polling and return to idle, discarding the session payload.
    pub async fn reset(&self) {
        let mut poller = self.poller.lock().await;
        if let Some(handle) = poller.take() {
            handle.stop().await;
        }
        self.store.reset().await;
        tracing::debug!("Session reset");
    }

    /// Download the active session's result to `dest`.
    ///
    /// Trusts the last-known status; no server re-check.  A failed
    /// download does not mutate job/batch status.
    pub async fn download(&self, dest: &Path) -> Result<u64, SessionError> {
        match self.store.snapshot().await {
            SessionState::Idle => Err(SessionError::Precondition(
                "no completed job or batch to download".into(),
            )),

            SessionState::Job(session) => {
                let last = session.last.as_ref().ok_or_else(|| {
                    SessionError::Precondition("job status not yet known".into())
                })?;
                if !matches!(last.status, JobStatus::Completed) {
                    return Err(SessionError::Precondition(format!(
                        "job not completed; status: {}",
                        last.status.as_str()
                    )));
                }
                Ok(self.backend.download_job(session.job_id, dest).await?)
            }

            SessionState::Batch(session) => {
                let last = session.last.as_ref().ok_or_else(|| {
                    SessionError::Precondition("batch status not yet known".into())
                })?;
                if !aggregate::is_downloadable(last.status) {
                    return Err(SessionError::Precondition(match last.status {
                        BatchStatus::RolledBack => {
                            "batch was rolled back; no committed output to download".into()
                        }
                        status => {
                            format!("batch not completed; status: {}", status.as_str())
                        }
                    }));
                }
                Ok(self.backend.download_batch(&session.batch_id, dest).await?)
            }
        }
    }

    // ---- private helpers ----

    async fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.store.snapshot().await.is_idle() {
            Ok(())
        } else {
            Err(SessionError::Precondition(
                "a job or batch is already active; reset the session first".into(),
            ))
        }
    }
}

/// Validate the dataset before any network call.
fn validate_dataset(file_name: &str, data: &[u8]) -> Result<(), SessionError> {
    if file_name.is_empty() || data.is_empty() {
        return Err(SessionError::Validation(
            "a dataset file must be selected".into(),
        ));
    }
    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(SessionError::Validation(
            "only CSV files are allowed".into(),
        ));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(SessionError::Validation(
            "dataset must be smaller than 50MB".into(),
        ));
    }
    Ok(())
}

/// The session changed out from under an operation (reset mid-flight).
fn stale_session() -> SessionError {
    SessionError::Precondition("session was reset while the operation was in flight".into())
}
