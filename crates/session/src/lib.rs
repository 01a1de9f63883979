//! Job/batch lifecycle tracking core.
//!
//! Owns the session state machine around the forecast service: submission
//! (single or batch, mutually exclusive per session), the status poller
//! task, cancellation serialized against in-flight polls, and result
//! retrieval.  Observers receive state changes over a broadcast channel.

pub mod backend;
pub mod controller;
pub mod error;
pub mod events;
mod poller;
pub mod state;

pub use backend::ForecastBackend;
pub use controller::{CancelOutcome, PollIntervals, SessionController};
pub use error::SessionError;
pub use events::SessionEvent;
pub use state::{BatchSession, JobSession, SessionState, SessionStore};
