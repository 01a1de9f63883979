//! Domain error type shared across the workspace.
//!
//! Transport errors live in the client crate; terminal FAILED/ROLLED_BACK
//! statuses are carried in-band on the records themselves, not as errors.

/// Errors raised by domain-level checks before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input rejected before submission.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An action attempted against an incompatible state, e.g. cancelling
    /// a terminal job or downloading an incomplete result.
    #[error("Precondition failed: {0}")]
    Precondition(String),
}
