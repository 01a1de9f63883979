//! Pure batch aggregation: derive the displayed view from a
//! [`BatchJobRecord`] without re-sorting, recomputing, or holding state.

use crate::batch::{BatchJobRecord, PartitionResult};
use crate::error::CoreError;
use crate::status::BatchStatus;

/// Derived view over one batch status response.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOverview {
    pub status: BatchStatus,
    /// The server-reported progress, verbatim.
    pub progress: u8,
    pub total_partitions: u32,
    pub completed_partitions: u32,
    pub failed_partitions: u32,
    /// Partitions whose status is FAILED or TIMEOUT, in server order.
    pub failed: Vec<PartitionResult>,
    /// Whether the batch's committed output may be downloaded.
    pub downloadable: bool,
}

/// Derive the displayed batch view.
///
/// The failed-partition list is a faithful passthrough of the server's
/// ordering; progress is never recomputed from partition counts (the two
/// numbers are independently meaningful, since server progress may weight
/// partitions by size).
pub fn aggregate(batch: &BatchJobRecord) -> BatchOverview {
    let failed: Vec<PartitionResult> = batch
        .partition_results
        .iter()
        .filter(|p| p.status.is_failure())
        .cloned()
        .collect();

    BatchOverview {
        status: batch.status,
        progress: batch.progress,
        total_partitions: batch.total_partitions,
        completed_partitions: batch.completed_partitions,
        failed_partitions: batch.failed_partitions,
        failed,
        downloadable: is_downloadable(batch.status),
    }
}

/// A batch result is downloadable only when COMPLETED.  A ROLLED_BACK
/// batch has no committed output even if individual partitions show
/// COMPLETED.
pub fn is_downloadable(status: BatchStatus) -> bool {
    status == BatchStatus::Completed
}

/// Check the partition-count invariants on a status response.
///
/// `completed + failed <= total`, and a COMPLETED batch must have every
/// partition completed and none failed.  Violations indicate a server
/// bug; callers log them rather than dropping the response.
pub fn validate_counts(batch: &BatchJobRecord) -> Result<(), CoreError> {
    if batch.completed_partitions + batch.failed_partitions > batch.total_partitions {
        return Err(CoreError::Validation(format!(
            "partition counts exceed total: {} completed + {} failed > {} total",
            batch.completed_partitions, batch.failed_partitions, batch.total_partitions
        )));
    }
    if batch.status == BatchStatus::Completed
        && (batch.completed_partitions != batch.total_partitions || batch.failed_partitions != 0)
    {
        return Err(CoreError::Validation(format!(
            "COMPLETED batch with {}/{} partitions completed and {} failed",
            batch.completed_partitions, batch.total_partitions, batch.failed_partitions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PartitionMetadata;
    use crate::status::PartitionStatus;

    fn partition(id: u32, status: PartitionStatus) -> PartitionResult {
        PartitionResult {
            partition_id: id,
            status,
            execution_time: None,
            error: None,
            metadata: PartitionMetadata::default(),
        }
    }

    fn batch(
        status: BatchStatus,
        progress: u8,
        total: u32,
        completed: u32,
        failed: u32,
        partitions: Vec<PartitionResult>,
    ) -> BatchJobRecord {
        BatchJobRecord {
            batch_id: "batch-1".into(),
            status,
            progress,
            total_partitions: total,
            completed_partitions: completed,
            failed_partitions: failed,
            partition_results: partitions,
            created_at: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    // -- Failed-partition list --

    #[test]
    fn failed_list_contains_failed_and_timeout_only() {
        let record = batch(
            BatchStatus::Processing,
            60,
            5,
            3,
            1,
            vec![
                partition(0, PartitionStatus::Completed),
                partition(1, PartitionStatus::Failed),
                partition(2, PartitionStatus::Completed),
                partition(3, PartitionStatus::Pending),
                partition(4, PartitionStatus::Completed),
            ],
        );
        let view = aggregate(&record);
        assert_eq!(view.failed.len(), 1);
        assert_eq!(view.failed[0].partition_id, 1);
        assert!(!view.downloadable);
    }

    #[test]
    fn failed_list_preserves_server_order() {
        // Deliberately out of partition_id order; the aggregator must not
        // re-sort.
        let record = batch(
            BatchStatus::Processing,
            10,
            4,
            0,
            3,
            vec![
                partition(3, PartitionStatus::Timeout),
                partition(1, PartitionStatus::Failed),
                partition(2, PartitionStatus::Failed),
                partition(0, PartitionStatus::Processing),
            ],
        );
        let ids: Vec<u32> = aggregate(&record)
            .failed
            .iter()
            .map(|p| p.partition_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    // -- Progress passthrough --

    #[test]
    fn progress_is_server_value_not_count_ratio() {
        // 3/5 completed but the server weights partitions by size.
        let record = batch(
            BatchStatus::Processing,
            45,
            5,
            3,
            0,
            vec![
                partition(0, PartitionStatus::Completed),
                partition(1, PartitionStatus::Completed),
                partition(2, PartitionStatus::Completed),
                partition(3, PartitionStatus::Processing),
                partition(4, PartitionStatus::Pending),
            ],
        );
        assert_eq!(aggregate(&record).progress, 45);
    }

    // -- Downloadability --

    #[test]
    fn completed_batch_is_downloadable() {
        let record = batch(BatchStatus::Completed, 100, 2, 2, 0, vec![]);
        assert!(aggregate(&record).downloadable);
    }

    #[test]
    fn rolled_back_batch_is_not_downloadable_despite_completed_partitions() {
        let record = batch(
            BatchStatus::RolledBack,
            75,
            4,
            3,
            1,
            vec![
                partition(0, PartitionStatus::Completed),
                partition(1, PartitionStatus::Completed),
                partition(2, PartitionStatus::Completed),
                partition(3, PartitionStatus::Timeout),
            ],
        );
        let view = aggregate(&record);
        assert!(!view.downloadable);
        assert_eq!(view.failed.len(), 1);
        assert_eq!(view.failed[0].status, PartitionStatus::Timeout);
    }

    #[test]
    fn failed_and_cancelled_batches_are_not_downloadable() {
        assert!(!is_downloadable(BatchStatus::Failed));
        assert!(!is_downloadable(BatchStatus::Cancelled));
        assert!(!is_downloadable(BatchStatus::Processing));
    }

    // -- Count invariants --

    #[test]
    fn counts_within_total_pass() {
        let record = batch(BatchStatus::Processing, 50, 5, 3, 1, vec![]);
        assert!(validate_counts(&record).is_ok());
    }

    #[test]
    fn counts_exceeding_total_rejected() {
        let record = batch(BatchStatus::Processing, 50, 5, 4, 2, vec![]);
        assert!(validate_counts(&record).is_err());
    }

    #[test]
    fn completed_requires_all_partitions_completed() {
        let record = batch(BatchStatus::Completed, 100, 5, 4, 0, vec![]);
        assert!(validate_counts(&record).is_err());

        let record = batch(BatchStatus::Completed, 100, 5, 5, 0, vec![]);
        assert!(validate_counts(&record).is_ok());
    }
}
