//! Session-level error type, one variant per client-side error domain.
//!
//! Domain failures (FAILED/ROLLED_BACK) are not errors here; they arrive
//! in-band as terminal statuses on the records themselves.

use demandcast_client::ApiError;
use demandcast_core::error::CoreError;

/// Errors raised by the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Malformed input rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Action attempted against an incompatible session state, rejected
    /// synchronously.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Network/timeout/parse failure talking to the forecast service.
    /// Never mutates the last-known job/batch status.
    #[error(transparent)]
    Transport(#[from] ApiError),

    /// A domain-level check from `demandcast-core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}
