//! Batch-job records, partition results, and submission analysis.

use serde::{Deserialize, Serialize};

use crate::status::{BatchStatus, PartitionStatus};
use crate::types::Timestamp;

/// One batch job as reported by the batch status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub batch_id: String,
    pub status: BatchStatus,
    /// Server-weighted completion percentage, 0-100.  Displayed verbatim;
    /// never recomputed from partition counts client-side.
    pub progress: u8,
    pub total_partitions: u32,
    pub completed_partitions: u32,
    pub failed_partitions: u32,
    /// Per-partition results in server order (partition_id ascending is
    /// expected but not enforced).
    #[serde(default)]
    pub partition_results: Vec<PartitionResult>,
    pub created_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

/// Result of one independently executed partition.
///
/// Immutable once COMPLETED/FAILED/TIMEOUT; only PENDING/PROCESSING
/// entries may be overwritten by later polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    /// Unique within a batch, order-stable across polls.
    pub partition_id: u32,
    pub status: PartitionStatus,
    /// Wall-clock execution time in seconds, once finished.
    pub execution_time: Option<f64>,
    pub error: Option<String>,
    pub metadata: PartitionMetadata,
}

/// Input slice description attached to each partition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartitionMetadata {
    /// Site codes contained in this partition.
    #[serde(default)]
    pub sites: Vec<String>,
    /// Input row count.
    #[serde(default)]
    pub rows: u64,
    /// Distinct part numbers in the slice.
    #[serde(default)]
    pub partnumbers_count: u64,
}

/// Partition-planning summary returned by a batch submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub total_rows: u64,
    pub unique_sites: u32,
    pub unique_partnumbers: u32,
    pub total_partitions: u32,
    pub estimated_time_minutes: f64,
    pub speedup_factor: f64,
}
