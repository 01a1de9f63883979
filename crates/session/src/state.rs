//! Session state store.
//!
//! Exactly one of {no job, single job, batch} is active at a time;
//! switching modes requires an explicit reset.  All mutation goes
//! through the store's methods; the controller, the poller task, and
//! the cancellation coordinator are the only writers, and the store's
//! merge rules give the cancel/poll race a single documented outcome:
//! terminal statuses are sticky, so a stale in-flight poll response can
//! never downgrade an authoritative post-cancel state.

use tokio::sync::RwLock;

use demandcast_core::aggregate;
use demandcast_core::batch::{BatchAnalysis, BatchJobRecord, PartitionResult};
use demandcast_core::job::JobRecord;
use demandcast_core::types::JobId;

use crate::error::SessionError;

/// The single-job session payload.
#[derive(Debug, Clone)]
pub struct JobSession {
    pub job_id: JobId,
    pub task_id: String,
    /// Last record applied from a poll or from the coordinator.
    pub last: Option<JobRecord>,
}

/// The batch session payload.
#[derive(Debug, Clone)]
pub struct BatchSession {
    pub batch_id: String,
    pub analysis: BatchAnalysis,
    pub last: Option<BatchJobRecord>,
}

/// Exactly one variant is held per session.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Job(JobSession),
    Batch(BatchSession),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Shared, lock-guarded session state.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the current state for rendering.
    pub async fn snapshot(&self) -> SessionState {
        self.inner.read().await.clone()
    }

    /// Drop the current job/batch and return to idle.
    pub async fn reset(&self) {
        *self.inner.write().await = SessionState::Idle;
    }

    /// Enter the single-job variant.  Fails if a job or batch is already
    /// active; resubmission is rejected, not queued.
    pub(crate) async fn begin_job(&self, job_id: JobId, task_id: String) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        if !state.is_idle() {
            return Err(SessionError::Precondition(
                "a job or batch is already active; reset the session first".into(),
            ));
        }
        *state = SessionState::Job(JobSession {
            job_id,
            task_id,
            last: None,
        });
        Ok(())
    }

    /// Enter the batch variant.  Same exclusivity rule as [`begin_job`].
    ///
    /// [`begin_job`]: Self::begin_job
    pub(crate) async fn begin_batch(
        &self,
        batch_id: String,
        analysis: BatchAnalysis,
    ) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        if !state.is_idle() {
            return Err(SessionError::Precondition(
                "a job or batch is already active; reset the session first".into(),
            ));
        }
        *state = SessionState::Batch(BatchSession {
            batch_id,
            analysis,
            last: None,
        });
        Ok(())
    }

    /// Apply a polled job record and return the effective record.
    ///
    /// Returns `None` when the session has moved on (reset or different
    /// job), signalling the poller to exit quietly.  Terminal statuses
    /// are sticky: a non-terminal response can never overwrite one.
    pub(crate) async fn apply_job_update(&self, record: JobRecord) -> Option<JobRecord> {
        let mut state = self.inner.write().await;
        let SessionState::Job(session) = &mut *state else {
            return None;
        };
        if session.job_id != record.job_id {
            return None;
        }

        if let Some(last) = &session.last {
            if last.status.is_terminal() && !record.status.is_terminal() {
                tracing::debug!(
                    job_id = record.job_id,
                    stale_status = record.status.as_str(),
                    kept_status = last.status.as_str(),
                    "Discarding stale non-terminal poll response",
                );
                return Some(last.clone());
            }
        }

        session.last = Some(record.clone());
        Some(record)
    }

    /// Apply a polled batch record and return the effective record.
    ///
    /// Same sticky-terminal rule as jobs, plus partition immutability:
    /// a partition that reached COMPLETED/FAILED/TIMEOUT keeps its entry
    /// even if a response claims it is PENDING/PROCESSING again.
    pub(crate) async fn apply_batch_update(&self, record: BatchJobRecord) -> Option<BatchJobRecord> {
        let mut state = self.inner.write().await;
        let SessionState::Batch(session) = &mut *state else {
            return None;
        };
        if session.batch_id != record.batch_id {
            return None;
        }

        if let Err(e) = aggregate::validate_counts(&record) {
            // Server-side accounting bug; keep the response but flag it.
            tracing::warn!(batch_id = %record.batch_id, error = %e, "Batch count invariant violated");
        }

        if let Some(last) = &session.last {
            if last.status.is_terminal() && !record.status.is_terminal() {
                tracing::debug!(
                    batch_id = %record.batch_id,
                    stale_status = record.status.as_str(),
                    kept_status = last.status.as_str(),
                    "Discarding stale non-terminal poll response",
                );
                return Some(last.clone());
            }
        }

        let mut record = record;
        if let Some(last) = &session.last {
            record.partition_results =
                merge_partitions(&last.partition_results, record.partition_results);
        }

        session.last = Some(record.clone());
        Some(record)
    }

    /// Install an authoritative job record, overwriting whatever a racing
    /// poll tick produced.  Used by the cancellation coordinator after
    /// its fresh post-cancel fetch.
    pub(crate) async fn install_job(&self, record: JobRecord) -> Option<JobRecord> {
        let mut state = self.inner.write().await;
        let SessionState::Job(session) = &mut *state else {
            return None;
        };
        if session.job_id != record.job_id {
            return None;
        }
        session.last = Some(record.clone());
        Some(record)
    }

    /// Install an authoritative batch record; see [`install_job`].
    ///
    /// [`install_job`]: Self::install_job
    pub(crate) async fn install_batch(&self, record: BatchJobRecord) -> Option<BatchJobRecord> {
        let mut state = self.inner.write().await;
        let SessionState::Batch(session) = &mut *state else {
            return None;
        };
        if session.batch_id != record.batch_id {
            return None;
        }
        session.last = Some(record.clone());
        Some(record)
    }
}

/// Merge a fresh partition list over the previous one, preserving the
/// server's ordering of the fresh list while keeping terminal entries
/// immutable.
fn merge_partitions(
    previous: &[PartitionResult],
    fresh: Vec<PartitionResult>,
) -> Vec<PartitionResult> {
    fresh
        .into_iter()
        .map(|partition| {
            if partition.status.is_terminal() {
                return partition;
            }
            previous
                .iter()
                .find(|p| p.partition_id == partition.partition_id && p.status.is_terminal())
                .cloned()
                .unwrap_or(partition)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use demandcast_core::batch::PartitionMetadata;
    use demandcast_core::status::{BatchStatus, JobStatus, PartitionStatus};

    fn job_record(job_id: JobId, status: JobStatus, progress: u8) -> JobRecord {
        JobRecord {
            job_id,
            task_id: Some("task".into()),
            status,
            progress,
            filename: None,
            created_at: None,
            started_at: None,
            completed_at: None,
            metrics: None,
            error_message: None,
        }
    }

    fn batch_record(status: BatchStatus, partitions: Vec<PartitionResult>) -> BatchJobRecord {
        BatchJobRecord {
            batch_id: "b-1".into(),
            status,
            progress: 0,
            total_partitions: partitions.len() as u32,
            completed_partitions: 0,
            failed_partitions: 0,
            partition_results: partitions,
            created_at: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    fn partition(id: u32, status: PartitionStatus) -> PartitionResult {
        PartitionResult {
            partition_id: id,
            status,
            execution_time: None,
            error: None,
            metadata: PartitionMetadata::default(),
        }
    }

    fn analysis() -> BatchAnalysis {
        BatchAnalysis {
            total_rows: 100,
            unique_sites: 2,
            unique_partnumbers: 10,
            total_partitions: 2,
            estimated_time_minutes: 1.0,
            speedup_factor: 1.5,
        }
    }

    #[tokio::test]
    async fn modes_are_mutually_exclusive() {
        let store = SessionStore::new();
        store.begin_job(1, "t".into()).await.unwrap();
        assert!(store.begin_batch("b-1".into(), analysis()).await.is_err());
        assert!(store.begin_job(2, "t2".into()).await.is_err());

        store.reset().await;
        assert!(store.begin_batch("b-1".into(), analysis()).await.is_ok());
    }

    #[tokio::test]
    async fn terminal_job_status_is_sticky() {
        let store = SessionStore::new();
        store.begin_job(1, "t".into()).await.unwrap();

        store
            .apply_job_update(job_record(1, JobStatus::Cancelled, 40))
            .await
            .unwrap();

        // A stale PROCESSING response from a racing tick must not win.
        let effective = store
            .apply_job_update(job_record(1, JobStatus::Processing, 45))
            .await
            .unwrap();
        assert_eq!(effective.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn install_overwrites_unconditionally() {
        let store = SessionStore::new();
        store.begin_job(1, "t".into()).await.unwrap();
        store
            .apply_job_update(job_record(1, JobStatus::Processing, 40))
            .await
            .unwrap();

        let installed = store
            .install_job(job_record(1, JobStatus::Cancelled, 40))
            .await
            .unwrap();
        assert_eq!(installed.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn update_for_a_different_job_is_ignored() {
        let store = SessionStore::new();
        store.begin_job(1, "t".into()).await.unwrap();
        assert!(store
            .apply_job_update(job_record(99, JobStatus::Processing, 10))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn update_after_reset_is_ignored() {
        let store = SessionStore::new();
        store.begin_job(1, "t".into()).await.unwrap();
        store.reset().await;
        assert!(store
            .apply_job_update(job_record(1, JobStatus::Processing, 10))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn terminal_partitions_are_immutable() {
        let store = SessionStore::new();
        store.begin_batch("b-1".into(), analysis()).await.unwrap();

        store
            .apply_batch_update(batch_record(
                BatchStatus::Processing,
                vec![
                    partition(0, PartitionStatus::Completed),
                    partition(1, PartitionStatus::Processing),
                ],
            ))
            .await
            .unwrap();

        // A later response claims partition 0 is back to PENDING.
        let effective = store
            .apply_batch_update(batch_record(
                BatchStatus::Processing,
                vec![
                    partition(0, PartitionStatus::Pending),
                    partition(1, PartitionStatus::Completed),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(
            effective.partition_results[0].status,
            PartitionStatus::Completed
        );
        assert_eq!(
            effective.partition_results[1].status,
            PartitionStatus::Completed
        );
    }
}
