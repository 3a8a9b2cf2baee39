//! Shared low-level helpers
//!
//! Cancellation signalling and log throttling used across the pipeline.

pub mod ratelimit;
pub mod sos;
