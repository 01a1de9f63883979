//! Lifecycle status enums for jobs, batches, and partitions.
//!
//! Wire values are the forecast service's SCREAMING_SNAKE_CASE literals.
//! Unknown tags fail deserialization; the poller treats that as a
//! transport error rather than silently mapping new server states to a
//! "pending" catch-all.

use serde::{Deserialize, Serialize};

/// Status of a single forecast job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// Only ever reached through explicit cancellation; the poller
    /// observes it, it never transitions there on its own.
    Cancelled,
}

impl JobStatus {
    /// No further transitions occur after a terminal status; polling stops.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// A job is active while it can still be cancelled.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    /// Wire literal, e.g. for query-string status filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Status of a batch job (aggregate over its partitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// At least one partition failed or timed out and the batch's
    /// committed output was discarded server-side.
    RolledBack,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::RolledBack | Self::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::RolledBack => "ROLLED_BACK",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Status of one independently executed partition of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// The server-enforced per-partition execution timeout fired.
    Timeout,
}

impl PartitionStatus {
    /// Terminal partition results are immutable; later polls may only
    /// overwrite PENDING/PROCESSING entries.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }

    /// FAILED and TIMEOUT both count toward the failed-partition list.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_wire_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: JobStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn batch_rolled_back_wire_literal() {
        let json = serde_json::to_string(&BatchStatus::RolledBack).unwrap();
        assert_eq!(json, "\"ROLLED_BACK\"");
    }

    #[test]
    fn unknown_status_tag_is_a_hard_error() {
        assert!(serde_json::from_str::<JobStatus>("\"SKIPPED\"").is_err());
        assert!(serde_json::from_str::<BatchStatus>("\"PAUSED\"").is_err());
        assert!(serde_json::from_str::<PartitionStatus>("\"SKIPPED\"").is_err());
    }

    #[test]
    fn job_terminal_and_active_sets_are_disjoint() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_ne!(status.is_terminal(), status.is_active());
        }
    }

    #[test]
    fn batch_terminal_set_includes_rollback() {
        assert!(BatchStatus::RolledBack.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
        assert!(!BatchStatus::Processing.is_terminal());
    }

    #[test]
    fn partition_failure_set_is_failed_or_timeout() {
        assert!(PartitionStatus::Failed.is_failure());
        assert!(PartitionStatus::Timeout.is_failure());
        assert!(!PartitionStatus::Completed.is_failure());
        assert!(!PartitionStatus::Pending.is_failure());
    }
}
