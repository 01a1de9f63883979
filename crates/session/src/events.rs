//! Session events emitted over a broadcast channel.
//!
//! Produced by the controller and the poller; consumed by whatever is
//! rendering the session (the CLI, a UI layer, tests).

use demandcast_core::batch::BatchJobRecord;
use demandcast_core::job::JobRecord;
use demandcast_core::types::JobId;

/// Broadcast channel capacity for session events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A state change in the active session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A single job was accepted by the service.
    JobSubmitted { job_id: JobId, task_id: String },

    /// A batch was accepted by the service.
    BatchSubmitted {
        batch_id: String,
        total_partitions: u32,
    },

    /// A poll (or the cancellation coordinator) produced a fresh job
    /// record.  Carries the effective record after merge rules.
    JobUpdated(JobRecord),

    /// A poll (or the coordinator) produced a fresh batch record.
    BatchUpdated(BatchJobRecord),

    /// A poll tick hit a transport error; polling has stopped and the
    /// last-known status is unchanged.  Resubmit or refresh to recover.
    PollFailed { message: String },

    /// Non-fatal notice the user should see, e.g. a site-code filter
    /// that batch mode will ignore.
    Warning { message: String },

    /// Cancellation was issued and the authoritative post-cancel state
    /// installed.
    JobCancelled { job_id: JobId },
    BatchCancelled { batch_id: String },
}
