//! Processing stage abstraction
//!
//! The per-frame transform is opaque to the concurrency core: workers only
//! see the [`ProcessingStage`] trait and build instances through a shared
//! [`StageFactory`]. Each instance is exclusively owned by one worker thread,
//! so implementations need `Send` but not `Sync`.

use crate::error::{StageBuildError, StageError};
use crate::pipeline::types::{FrameGeometry, PixelFormat, VideoFrame};

pub mod passthrough;

pub use passthrough::Passthrough;

/// Everything a factory needs to build one stage instance.
///
/// Mirrors the negotiation inputs: the stage spec substring, the geometry of
/// the frames the instance will receive, the format requested downstream and
/// the stage-internal parallelism degree.
#[derive(Debug, Clone)]
pub struct StageParams {
    /// Opaque stage spec extracted from the pipeline configuration string
    pub spec: String,

    /// Input-side geometry the instance is built for
    pub geometry: FrameGeometry,

    /// Pixel format requested on the output side
    pub output_format: PixelFormat,

    /// Parallelism degree inside the stage itself
    pub parallelism: usize,
}

/// Outcome of handing one frame to a stage.
///
/// Ownership is explicit at every exit: `Produced` and `NotReady` carry a
/// frame out, `Consumed` and `Fatal` mean the stage kept or released it.
pub enum ProcessResult {
    /// A finished frame, ready for reordering
    Produced(VideoFrame),

    /// Input accepted, nothing to emit this round
    Consumed,

    /// Stage not ready for this frame yet; ownership returns to the caller,
    /// which retries the same call after yielding
    NotReady(VideoFrame),

    /// Unrecoverable stage failure; the input frame is gone
    Fatal(StageError),
}

/// One opaque transform instance, exclusively owned by a single worker.
pub trait ProcessingStage: Send {
    /// Process one frame
    fn process(&mut self, frame: VideoFrame) -> ProcessResult;

    /// Geometry and format this instance emits, as negotiated at build time
    fn output_geometry(&self) -> FrameGeometry;
}

/// Builder for [`ProcessingStage`] instances.
///
/// Shared by every worker of a pipeline; builds are serialized per worker by
/// construction (each worker builds only its own instance), so factories only
/// need to be safe to call concurrently.
pub trait StageFactory: Send + Sync {
    fn build(&self, params: &StageParams) -> Result<Box<dyn ProcessingStage>, StageBuildError>;
}

/// Any `Fn(&StageParams) -> Result<Box<dyn ProcessingStage>, _>` is a factory.
impl<F> StageFactory for F
where
    F: Fn(&StageParams) -> Result<Box<dyn ProcessingStage>, StageBuildError> + Send + Sync,
{
    fn build(&self, params: &StageParams) -> Result<Box<dyn ProcessingStage>, StageBuildError> {
        self(params)
    }
}
