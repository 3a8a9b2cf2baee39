//! Health metrics for one pipeline instance

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters tracking what the pipeline did with its frames.
///
/// All fields use atomic operations for thread-safe access; one instance is
/// shared by the caller thread and every worker of a single pipeline.
pub struct PipelineHealth {
    /// Frames accepted through admission
    pub frames_admitted: AtomicU64,

    /// Frames delivered to the caller in order
    pub frames_delivered: AtomicU64,

    /// Frames released without delivery (stage unavailable, abort, drain)
    pub frames_dropped: AtomicU64,

    /// Stage build failures and fatal stage errors
    pub stage_failures: AtomicU64,

    /// Retrieval attempts that found the cursor slot empty
    pub not_ready_polls: AtomicU64,

    /// Total bytes of delivered frame data
    pub bytes_delivered: AtomicU64,

    /// Timestamp (Unix microseconds) of the last delivered frame
    pub last_output_time: AtomicU64,
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl PipelineHealth {
    pub fn new() -> Self {
        Self {
            frames_admitted: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            stage_failures: AtomicU64::new(0),
            not_ready_polls: AtomicU64::new(0),
            bytes_delivered: AtomicU64::new(0),
            last_output_time: AtomicU64::new(now_micros()),
        }
    }

    pub fn record_admitted(&self) {
        self.frames_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, size: usize) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered
            .fetch_add(size as u64, Ordering::Relaxed);
        self.last_output_time.store(now_micros(), Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drops(&self, count: u64) {
        self.frames_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_stage_failure(&self) {
        self.stage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_ready(&self) {
        self.not_ready_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_admitted(&self) -> u64 {
        self.frames_admitted.load(Ordering::Relaxed)
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn stage_failures(&self) -> u64 {
        self.stage_failures.load(Ordering::Relaxed)
    }

    pub fn not_ready_polls(&self) -> u64 {
        self.not_ready_polls.load(Ordering::Relaxed)
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered.load(Ordering::Relaxed)
    }

    /// Frames admitted but neither delivered nor dropped yet
    pub fn frames_in_flight(&self) -> u64 {
        self.frames_admitted()
            .saturating_sub(self.frames_delivered())
            .saturating_sub(self.frames_dropped())
    }

    /// Drop rate as a percentage of admitted frames
    pub fn drop_rate(&self) -> f64 {
        let admitted = self.frames_admitted();
        if admitted == 0 {
            return 0.0;
        }
        (self.frames_dropped() as f64 / admitted as f64) * 100.0
    }

    /// Check if the pipeline has delivered nothing for `threshold`
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let elapsed = now_micros().saturating_sub(self.last_output_time.load(Ordering::Relaxed));
        elapsed > threshold.as_micros() as u64
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_admitted: self.frames_admitted(),
            frames_delivered: self.frames_delivered(),
            frames_dropped: self.frames_dropped(),
            stage_failures: self.stage_failures(),
            not_ready_polls: self.not_ready_polls(),
            bytes_delivered: self.bytes_delivered(),
            drop_rate: self.drop_rate(),
        }
    }
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health counters
#[derive(Debug, Clone)]
pub struct HealthSummary {
    pub frames_admitted: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub stage_failures: u64,
    pub not_ready_polls: u64,
    pub bytes_delivered: u64,
    pub drop_rate: f64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} admitted, {} delivered ({} bytes), {} dropped ({:.2}%), {} stage failures, {} empty polls",
            self.frames_admitted,
            self.frames_delivered,
            self.bytes_delivered,
            self.frames_dropped,
            self.drop_rate,
            self.stage_failures,
            self.not_ready_polls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let health = PipelineHealth::new();

        health.record_admitted();
        health.record_admitted();
        health.record_admitted();
        health.record_delivered(1000);
        health.record_delivered(500);
        health.record_drop();

        assert_eq!(health.frames_admitted(), 3);
        assert_eq!(health.frames_delivered(), 2);
        assert_eq!(health.bytes_delivered(), 1500);
        assert_eq!(health.frames_dropped(), 1);
        assert_eq!(health.frames_in_flight(), 0);
        assert!(health.drop_rate() > 0.0);
    }

    #[test]
    fn stall_detection() {
        let health = PipelineHealth::new();
        assert!(!health.is_stalled(Duration::from_secs(1)));

        health.record_delivered(1000);
        std::thread::sleep(Duration::from_millis(150));
        assert!(health.is_stalled(Duration::from_millis(100)));
    }
}
