//! Pipeline lifecycle and caller surface
//!
//! [`FramePipeline`] owns construction, startup negotiation, the admission
//! and retrieval operations, and shutdown. One caller thread drives
//! `push`/`pull`; the workers spawned by `start()` do everything in between.

use log::{debug, error, info, trace};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::queue::InputQueue;
use crate::pipeline::reorder::ReorderBuffer;
use crate::pipeline::state::PipelineState;
use crate::pipeline::types::{FrameGeometry, PixelFormat, VideoFrame};
use crate::pipeline::worker::Worker;
use crate::stage::{StageFactory, StageParams};
use crate::utils::ratelimit::LogThrottle;
use crate::utils::sos::SignalOfStop;

/// Poll interval while admission waits for queue space
const BACKPRESSURE_POLL: Duration = Duration::from_millis(2);

/// How many empty retrievals pass between trace lines
const NOT_READY_LOG_EVERY: u64 = 100;

/// State shared between the caller thread and every worker of one pipeline.
///
/// Everything here is instance-scoped; independent pipelines never touch
/// each other's queues, counters or abort flag.
pub(crate) struct PipelineShared {
    config: PipelineConfig,
    pub output_format: PixelFormat,
    pub factory: Arc<dyn StageFactory>,
    pub input: InputQueue,
    pub output: ReorderBuffer,
    pub sos: SignalOfStop,
    pub health: PipelineHealth,
}

impl PipelineShared {
    pub fn stage_spec(&self) -> &str {
        &self.config.stage_spec
    }

    pub fn stage_parallelism(&self) -> usize {
        self.config.stage_parallelism
    }
}

/// Bounded multi-worker frame pipeline with order-preserving output.
///
/// Frames admitted through [`push`](Self::push) fan out across the worker
/// pool and come back through [`pull`](Self::pull) in admission order,
/// regardless of per-frame processing latency.
pub struct FramePipeline {
    shared: Arc<PipelineShared>,
    workers: Vec<JoinHandle<()>>,
    state: PipelineState,
    /// Input-side geometry used for startup negotiation
    input_geometry: FrameGeometry,
    /// Geometry currently advertised downstream
    advertised: FrameGeometry,
    not_ready_log: LogThrottle,
}

impl FramePipeline {
    /// Allocate a configured pipeline. No thread is spawned yet.
    pub fn new(
        config: PipelineConfig,
        factory: Arc<dyn StageFactory>,
        input_geometry: FrameGeometry,
        output_format: PixelFormat,
    ) -> Self {
        let shared = PipelineShared {
            input: InputQueue::new(config.queue_capacity),
            output: ReorderBuffer::new(config.reorder_capacity),
            config,
            output_format,
            factory,
            sos: SignalOfStop::new(),
            health: PipelineHealth::new(),
        };

        Self {
            shared: Arc::new(shared),
            workers: Vec::new(),
            state: PipelineState::Configured,
            input_geometry,
            advertised: input_geometry.with_format(output_format),
            not_ready_log: LogThrottle::new(NOT_READY_LOG_EVERY),
        }
    }

    /// Negotiate the output geometry and spawn the worker pool.
    ///
    /// Worker 0's stage is built on the calling thread first; what it reports
    /// becomes the advertised downstream geometry before any frame flows. If
    /// that build fails, startup is aborted with no worker thread running.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.state.is_running() {
            return Ok(());
        }
        let target = PipelineState::Running {
            started_at: Instant::now(),
        };
        if !self.state.can_transition_to(&target) {
            return Err(PipelineError::NotRunning {
                state: self.state.description(),
            });
        }

        let params = StageParams {
            spec: self.shared.stage_spec().to_string(),
            geometry: self.input_geometry,
            output_format: self.shared.output_format,
            parallelism: self.shared.stage_parallelism(),
        };
        let stage0 = self
            .shared
            .factory
            .build(&params)
            .map_err(ConfigError::StartupStage)?;
        self.advertised = stage0.output_geometry();

        let count = self.shared.config.workers;
        let mut stage0 = Some(stage0);
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let mut worker = Worker::new(index, Arc::clone(&self.shared));
            if let Some(stage) = stage0.take() {
                worker = worker.with_stage(stage, self.input_geometry);
            }
            let spawned = std::thread::Builder::new()
                .name(format!("framefan-worker-{index}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // No worker may be left running after a failed startup
                    self.shared.sos.cancel();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    self.shared.input.drain();
                    self.shared.output.drain();
                    self.state = PipelineState::Stopped;
                    return Err(PipelineError::Spawn(err));
                }
            }
        }

        self.workers = workers;
        self.state = target;
        info!(
            "pipeline running: {} workers (tpn {}), stage `{}`, output {}",
            count,
            self.shared.stage_parallelism(),
            self.shared.stage_spec(),
            self.advertised
        );
        Ok(())
    }

    /// Admit one frame, waiting briefly while the queue is at capacity.
    ///
    /// The frame is released and `Aborted` returned if the pipeline shuts
    /// down while waiting; admission never silently drops a frame otherwise.
    pub fn push(&mut self, frame: VideoFrame) -> Result<(), PipelineError> {
        if !self.state.is_running() {
            return Err(PipelineError::NotRunning {
                state: self.state.description(),
            });
        }

        let mut pending = frame;
        loop {
            if self.shared.sos.cancelled() {
                drop(pending);
                self.shared.health.record_drop();
                return Err(PipelineError::Aborted);
            }
            match self.shared.input.try_push(pending) {
                Ok(_ticket) => {
                    self.shared.health.record_admitted();
                    return Ok(());
                }
                Err(back) => {
                    pending = back;
                    self.shared.sos.sleep(BACKPRESSURE_POLL);
                }
            }
        }
    }

    /// Retrieve the next output frame in admission order.
    ///
    /// `None` means not ready, never an error; the caller polls again later.
    /// The advertised geometry is retagged lazily the first time a delivered
    /// frame's attributes diverge from it.
    pub fn pull(&mut self) -> Option<VideoFrame> {
        match self.shared.output.try_pop() {
            Some(frame) => {
                self.shared.health.record_delivered(frame.size());
                let geometry = frame.geometry();
                if geometry != self.advertised {
                    info!("output geometry changed: {} -> {}", self.advertised, geometry);
                    self.advertised = geometry;
                }
                Some(frame)
            }
            None => {
                self.shared.health.record_not_ready();
                if self.not_ready_log.tick() {
                    trace!(
                        "read cursor slot empty ({} empty polls so far)",
                        self.not_ready_log.hits()
                    );
                }
                None
            }
        }
    }

    /// Set the abort flag, join every worker, release undelivered frames.
    ///
    /// Workers are joined before any shared structure is drained. Safe to
    /// call more than once.
    pub fn stop(&mut self) {
        if self.state == PipelineState::Stopped {
            return;
        }
        self.state = PipelineState::Draining;
        self.shared.sos.cancel();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }

        let released = self.shared.input.drain() + self.shared.output.drain();
        if released > 0 {
            self.shared.health.record_drops(released as u64);
            debug!("released {released} undelivered frames on shutdown");
        }

        self.state = PipelineState::Stopped;
        info!("pipeline stopped: {}", self.shared.health.summary());
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Health counters of this instance
    pub fn health(&self) -> &PipelineHealth {
        &self.shared.health
    }

    /// Geometry and format currently advertised downstream
    pub fn output_geometry(&self) -> FrameGeometry {
        self.advertised
    }

    /// The validated configuration this pipeline was built from
    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
