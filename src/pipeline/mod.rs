//! Frame pipeline core
//!
//! This module holds the concurrency engine, separating concerns between:
//! - Admission: bounded input queue assigning sequence tickets
//! - Processing: worker threads racing for frames, each owning one stage
//! - Reassembly: slot-keyed reorder buffer read by a single cursor
//! - Control: lifecycle state machine and health counters
//!
//! # Architecture
//!
//! The caller thread pushes frames into the input queue and pulls results
//! from the reorder buffer; workers connect the two in between:
//! - Completion order across workers carries no guarantee at all
//! - Delivery order equals admission order, recovered from slot keying
//! - Every wait polls a short fixed interval and wakes early on abort
//! - Each stage instance belongs to exactly one worker thread

pub mod coordinator;
pub mod health;
pub(crate) mod queue;
pub(crate) mod reorder;
pub mod state;
pub mod types;
pub(crate) mod worker;

pub use coordinator::FramePipeline;
pub use health::{HealthSummary, PipelineHealth};
pub use state::PipelineState;
pub use types::{AspectRatio, FrameGeometry, PixelFormat, Timestamp, VideoFrame};
