//! Worker thread loop
//!
//! Each worker owns one processing stage instance, races the others for
//! frames on the input queue and parks results in the reorder buffer. No
//! lock is ever held across a `process()` call.

use log::{debug, error, trace};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::coordinator::PipelineShared;
use crate::pipeline::types::{FrameGeometry, VideoFrame};
use crate::stage::{ProcessResult, ProcessingStage, StageParams};
use crate::utils::ratelimit::LogThrottle;

/// Poll interval while the input queue is empty
const EMPTY_POLL: Duration = Duration::from_millis(5);

/// Poll interval while a reorder slot is not yet writable
const SLOT_POLL: Duration = Duration::from_millis(2);

/// Queue occupancy below which the full-queue trace latch re-arms
const QUEUE_FULL_REARM: usize = 10;

/// How many stage-unavailable drops pass between log lines
const UNAVAILABLE_LOG_EVERY: u64 = 100;

pub(crate) struct Worker {
    index: usize,
    shared: Arc<PipelineShared>,
    /// The owned stage instance; dropped when the worker exits
    stage: Option<Box<dyn ProcessingStage>>,
    /// Input geometry the current instance was built for
    built_for: Option<FrameGeometry>,
    unavailable_log: LogThrottle,
}

/// What processing one frame left behind
enum Processed {
    Output(VideoFrame),
    Nothing,
    WorkerDead,
    Aborted,
}

impl Worker {
    pub fn new(index: usize, shared: Arc<PipelineShared>) -> Self {
        Self {
            index,
            shared,
            stage: None,
            built_for: None,
            unavailable_log: LogThrottle::new(UNAVAILABLE_LOG_EVERY),
        }
    }

    /// Hand worker 0 the stage built during startup negotiation.
    pub fn with_stage(mut self, stage: Box<dyn ProcessingStage>, built_for: FrameGeometry) -> Self {
        self.stage = Some(stage);
        self.built_for = Some(built_for);
        self
    }

    pub fn run(mut self) {
        debug!("worker {} started", self.index);
        let mut full_logged = false;

        while !self.shared.sos.cancelled() {
            let queued = self.shared.input.len();
            if queued == 0 {
                self.shared.sos.sleep(EMPTY_POLL);
                continue;
            }

            // Trace once per full episode, re-arm once the queue drains
            if queued >= self.shared.input.capacity() {
                if !full_logged {
                    full_logged = true;
                    trace!(
                        "worker {}: input queue full at {} frames for stage `{}`",
                        self.index, queued, self.shared.stage_spec()
                    );
                }
            } else if full_logged && queued < QUEUE_FULL_REARM {
                full_logged = false;
            }

            let Some(frame) = self.shared.input.try_pop() else {
                // Another worker won the race
                continue;
            };
            let ticket = frame.ticket;

            let Some(mut stage) = self.ensure_stage(frame.geometry()) else {
                // Unprocessable frame: release it and retire its ticket so
                // the read cursor does not wait on it forever
                drop(frame);
                self.shared.health.record_drop();
                self.retire(ticket);
                continue;
            };

            match self.process_one(stage.as_mut(), frame) {
                Processed::Output(mut out) => {
                    self.stage = Some(stage);
                    // Stages may emit a brand new frame; the ticket follows
                    // the input regardless
                    out.ticket = ticket;
                    self.park(out);
                }
                Processed::Nothing => {
                    self.stage = Some(stage);
                    self.retire(ticket);
                }
                Processed::WorkerDead => {
                    self.retire(ticket);
                    return;
                }
                Processed::Aborted => {
                    debug!("worker {} exiting", self.index);
                    return;
                }
            }
        }

        debug!("worker {} exiting", self.index);
    }

    /// Run one frame through the stage, retrying while it reports not-ready.
    fn process_one(&self, stage: &mut dyn ProcessingStage, frame: VideoFrame) -> Processed {
        let mut pending = frame;
        loop {
            match stage.process(pending) {
                ProcessResult::Produced(out) => return Processed::Output(out),
                ProcessResult::Consumed => return Processed::Nothing,
                ProcessResult::NotReady(back) => {
                    if self.shared.sos.cancelled() {
                        drop(back);
                        self.shared.health.record_drop();
                        return Processed::Aborted;
                    }
                    pending = back;
                    std::thread::yield_now();
                }
                ProcessResult::Fatal(err) => {
                    self.shared.health.record_stage_failure();
                    self.shared.health.record_drop();
                    error!(
                        "worker {}: fatal stage error: {}; terminating this worker",
                        self.index, err
                    );
                    return Processed::WorkerDead;
                }
            }
        }
    }

    /// Take the owned stage for `geometry`, (re)building it through the
    /// factory. Returns `None` when the stage is unavailable.
    fn ensure_stage(&mut self, geometry: FrameGeometry) -> Option<Box<dyn ProcessingStage>> {
        if self.built_for == Some(geometry)
            && let Some(stage) = self.stage.take()
        {
            return Some(stage);
        }

        let params = StageParams {
            spec: self.shared.stage_spec().to_string(),
            geometry,
            output_format: self.shared.output_format,
            parallelism: self.shared.stage_parallelism(),
        };
        match self.shared.factory.build(&params) {
            Ok(stage) => {
                debug!("worker {}: stage built for {}", self.index, geometry);
                self.stage = None;
                self.built_for = Some(geometry);
                Some(stage)
            }
            Err(err) => {
                self.stage = None;
                self.built_for = None;
                self.shared.health.record_stage_failure();
                if self.unavailable_log.tick() {
                    error!(
                        "worker {}: {} ({} occurrences), dropping frame",
                        self.index,
                        err,
                        self.unavailable_log.hits()
                    );
                }
                None
            }
        }
    }

    /// Write a produced frame into its reorder slot, waiting while the slot
    /// is not yet writable. On abort the frame is released instead.
    fn park(&self, frame: VideoFrame) {
        let mut pending = frame;
        loop {
            match self.shared.output.try_store(pending) {
                Ok(()) => return,
                Err(back) => {
                    if self.shared.sos.sleep(SLOT_POLL) {
                        drop(back);
                        self.shared.health.record_drop();
                        return;
                    }
                    pending = back;
                }
            }
        }
    }

    /// Retire a ticket that will never produce output, waiting for its slot
    /// window exactly like a store would.
    fn retire(&self, ticket: u64) {
        while !self.shared.output.try_skip(ticket) {
            if self.shared.sos.sleep(SLOT_POLL) {
                return;
            }
        }
    }
}
