//! Domain model for the demand-forecast lifecycle client.
//!
//! Passive data definitions shared by the HTTP client and the session
//! layer: job/batch/partition status enums, the records returned by the
//! forecast service, the submission configuration, and the pure batch
//! aggregation logic.  Nothing in this crate performs I/O.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod job;
pub mod status;
pub mod types;
