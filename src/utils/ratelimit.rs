use std::sync::atomic::{AtomicU64, Ordering};

/// Counter-based log throttle.
///
/// Sustained failure conditions (a stage that cannot be built, a reader
/// polling an empty slot) would otherwise flood the log with one line per
/// occurrence. The throttle lets one line through every `every` hits and
/// keeps the running count available so the suppressed occurrences can still
/// be reported in the line that does go out.
///
/// Throttles are owned by the structure whose failures they count, never
/// shared between pipeline instances.
pub struct LogThrottle {
    every: u64,
    hits: AtomicU64,
}

impl LogThrottle {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            hits: AtomicU64::new(0),
        }
    }

    /// Record one occurrence. Returns `true` when this one should be logged.
    pub fn tick(&self) -> bool {
        let n = self.hits.fetch_add(1, Ordering::Relaxed);
        n % self.every == 0
    }

    /// Total occurrences recorded so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hit_always_logs() {
        let throttle = LogThrottle::new(100);
        assert!(throttle.tick());
    }

    #[test]
    fn passes_one_in_every_n() {
        let throttle = LogThrottle::new(10);
        let logged = (0..35).filter(|_| throttle.tick()).count();
        assert_eq!(logged, 4); // hits 0, 10, 20, 30
        assert_eq!(throttle.hits(), 35);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let throttle = LogThrottle::new(0);
        assert!(throttle.tick());
        assert!(throttle.tick());
    }
}
