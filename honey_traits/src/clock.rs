use std::thread;
use std::time::{Duration, Instant};

/// Time source for the dispenser loop, the tare settle timer and the
/// settings flush debounce. Tests swap in `TestClock`.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds since `epoch`; 0 if `epoch` lies in the future.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether `period` has elapsed since `last`, boundary included.
    fn is_due(&self, last: Instant, period: Duration) -> bool {
        self.now().saturating_duration_since(last) >= period
    }
}

/// Wall-clock `Instant` time; the loop's sleeps are real.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Manually driven clock for dispenser tests.
    ///
    /// The runner's `sleep` jumps straight to the next tick deadline. A test
    /// keeps one clone to step tare settling and flush timers while the
    /// dispenser holds another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Move time forward by `d`.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// One control tick is `advance_ms(20)`.
        pub fn advance_ms(&self, ms: u64) {
            self.advance(Duration::from_millis(ms));
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_time() {
            let a = TestClock::new();
            let b = a.clone();
            let t0 = b.now();
            a.advance_ms(20);
            assert_eq!(b.ms_since(t0), 20);
        }

        #[test]
        fn is_due_uses_inclusive_period() {
            let clock = TestClock::new();
            let last = clock.now();
            clock.advance_ms(19);
            assert!(!clock.is_due(last, Duration::from_millis(20)));
            clock.advance_ms(1);
            assert!(clock.is_due(last, Duration::from_millis(20)));
        }
    }
}
