//! framefan: bounded multi-worker frame pipeline with order-preserving output
//!
//! A sequential stream of video frames is fanned out across a fixed pool of
//! worker threads, each owning an independent instance of an opaque
//! processing stage, and reassembled into admission order no matter how far
//! out of order the workers finish.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use framefan::{
//!     FrameGeometry, FramePipeline, Passthrough, PipelineConfig, PixelFormat, Timestamp,
//!     VideoFrame,
//! };
//!
//! # fn main() -> Result<(), framefan::PipelineError> {
//! let config = PipelineConfig::parse("{null}:threads=4:tpn=2")?;
//! let geometry = FrameGeometry::new(1280, 720, PixelFormat::Yuv420p);
//! let mut pipeline = FramePipeline::new(
//!     config,
//!     Arc::new(Passthrough::factory()),
//!     geometry,
//!     PixelFormat::Yuv420p,
//! );
//! pipeline.start()?;
//!
//! pipeline.push(VideoFrame::new(Bytes::new(), geometry, Timestamp::from_micros(0)))?;
//! while let Some(frame) = pipeline.pull() {
//!     // frames come back in admission order
//!     drop(frame);
//! }
//! pipeline.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError, StageBuildError, StageError};
pub use pipeline::{
    AspectRatio, FrameGeometry, FramePipeline, HealthSummary, PipelineHealth, PipelineState,
    PixelFormat, Timestamp, VideoFrame,
};
pub use stage::{Passthrough, ProcessResult, ProcessingStage, StageFactory, StageParams};
pub use utils::sos::SignalOfStop;
