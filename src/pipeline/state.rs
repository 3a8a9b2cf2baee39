//! Pipeline lifecycle state machine

use std::time::Instant;

/// Lifecycle of one pipeline instance
///
/// Transitions are validated so that startup negotiation, draining and
/// teardown always happen in order, never concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No resources allocated yet
    Uninitialized,

    /// Queues allocated, worker count fixed, no thread spawned
    Configured,

    /// Workers spawned and processing frames
    Running {
        /// When the pipeline started running
        started_at: Instant,
    },

    /// Abort signalled, workers exiting
    Draining,

    /// Every worker joined, remaining frames released
    Stopped,
}

impl PipelineState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &PipelineState) -> bool {
        use PipelineState::*;

        match (self, target) {
            (Uninitialized, Configured) => true,

            (Configured, Running { .. }) => true,
            // A pipeline that never started can still be torn down
            (Configured, Draining) => true,

            (Running { .. }, Draining) => true,

            (Draining, Stopped) => true,

            // Terminal: a stopped pipeline is never restarted
            (Stopped, _) => false,

            // Self-transitions
            (a, b) if a == b => true,

            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            PipelineState::Uninitialized => "Uninitialized",
            PipelineState::Configured => "Configured",
            PipelineState::Running { .. } => "Running",
            PipelineState::Draining => "Draining",
            PipelineState::Stopped => "Stopped",
        }
    }

    /// Check if the pipeline is running
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running { .. })
    }

    /// Check if the pipeline is stopped or draining
    pub fn is_stopped(&self) -> bool {
        matches!(self, PipelineState::Stopped | PipelineState::Draining)
    }

    /// Get the duration since the pipeline started (if running)
    pub fn running_duration(&self) -> Option<std::time::Duration> {
        if let PipelineState::Running { started_at } = self {
            Some(started_at.elapsed())
        } else {
            None
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
