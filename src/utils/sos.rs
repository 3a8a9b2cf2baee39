use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Cancellation signal shared by every loop of one pipeline instance.
///
/// The flag is instance-scoped: two pipelines running side by side each carry
/// their own signal and never wake each other. Waiters park on a condvar so
/// that `cancel()` unblocks them immediately instead of at the end of their
/// polling interval.
#[derive(Debug)]
pub struct SignalOfStop {
    // Shared state between clones
    shared: Arc<SharedState>,
}

#[derive(Debug)]
struct SharedState {
    closing: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            shared: Arc::new(SharedState {
                closing: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.shared.closing.store(true, Ordering::Relaxed);

        // Lock briefly to synchronize with threads entering a wait
        let _guard = self.shared.mutex.lock().unwrap();
        self.shared.condvar.notify_all();
    }

    pub fn cancelled(&self) -> bool {
        self.shared.closing.load(Ordering::Relaxed)
    }

    /// Sleep for at most `interval`, waking early on cancellation.
    ///
    /// Returns `true` when the signal was cancelled, either before or during
    /// the wait.
    pub fn sleep(&self, interval: Duration) -> bool {
        if self.cancelled() {
            return true;
        }

        let guard = self.shared.mutex.lock().unwrap();
        if self.cancelled() {
            return true;
        }
        let _ = self.shared.condvar.wait_timeout(guard, interval).unwrap();
        self.cancelled()
    }

    /// Block until the signal is cancelled.
    pub fn wait_cancellation(&self) {
        let mut guard = self.shared.mutex.lock().unwrap();

        while !self.cancelled() {
            guard = self.shared.condvar.wait(guard).unwrap();
        }
    }
}

impl Default for SignalOfStop {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SignalOfStop {
    fn clone(&self) -> SignalOfStop {
        SignalOfStop {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleep_runs_full_interval_without_cancel() {
        let sos = SignalOfStop::new();
        let start = Instant::now();
        assert!(!sos.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn cancel_wakes_sleeper_early() {
        let sos = SignalOfStop::new();
        let waiter = sos.clone();

        let handle = std::thread::spawn(move || {
            let start = Instant::now();
            assert!(waiter.sleep(Duration::from_secs(5)));
            start.elapsed()
        });

        std::thread::sleep(Duration::from_millis(30));
        sos.cancel();

        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn cancelled_signal_never_sleeps() {
        let sos = SignalOfStop::new();
        sos.cancel();
        let start = Instant::now();
        assert!(sos.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
