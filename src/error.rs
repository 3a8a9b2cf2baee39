//! Error taxonomy for pipeline construction and operation
//!
//! Backpressure (full queues, occupied slots) and empty polls are not errors
//! and never appear here; they are resolved by waiting or by returning
//! "not ready" to the caller.

use thiserror::Error;

/// A processing stage could not be built for the requested parameters.
///
/// At startup, worker 0 hitting this is fatal ([`ConfigError::StartupStage`]).
/// At runtime it only costs the frame in hand: the worker drops it and keeps
/// serving the queue.
#[derive(Debug, Error)]
#[error("stage `{spec}` unavailable: {reason}")]
pub struct StageBuildError {
    /// Stage spec the build was attempted for
    pub spec: String,
    /// Human-readable build failure cause
    pub reason: String,
}

impl StageBuildError {
    pub fn new(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

/// Fatal processing failure reported by a stage.
///
/// Policy: a fatal stage error terminates the reporting worker only; the
/// pipeline keeps running with degraded parallelism.
#[derive(Debug, Error)]
#[error("stage processing failed: {reason}")]
pub struct StageError {
    pub reason: String,
}

impl StageError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Configuration rejected before any resource was allocated, or startup
/// negotiation failed before any worker thread was left running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("empty pipeline spec")]
    Empty,

    #[error("pipeline spec too long: {len} > {max}")]
    TooLong { len: usize, max: usize },

    #[error("missing stage spec, expected a `{{...}}` block")]
    MissingStageSpec,

    #[error("invalid value `{value}` for field `{field}`")]
    InvalidField { field: &'static str, value: String },

    #[error("invalid capacity for `{field}`: must be non-zero")]
    ZeroCapacity { field: &'static str },

    #[error("startup stage build failed: {0}")]
    StartupStage(#[from] StageBuildError),
}

/// Errors surfaced by the pipeline's public admission/lifecycle operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline is not running (state: {state})")]
    NotRunning { state: &'static str },

    #[error("pipeline aborted")]
    Aborted,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
