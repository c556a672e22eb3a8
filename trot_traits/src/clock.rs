use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used for every wait in the controller.
///
/// - now(): returns a monotonic Instant
/// - sleep(): suspends for the provided duration (implementations may simulate)
/// - elapsed(): helper to compute time passed since an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Time elapsed since `epoch`, saturating at zero.
    fn elapsed(&self, epoch: Instant) -> Duration {
        self.now().saturating_duration_since(epoch)
    }
}

/// Wall-clock implementation backed by `std::time::Instant` and `thread::sleep`.
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

    /// Deterministic clock for tests.
    ///
    /// now() = origin + offset; sleep(d) advances the offset by d and records d.
    /// Clones share the same timeline.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        inner: Arc<Mutex<Timeline>>,
    }

    #[derive(Debug, Default)]
    struct Timeline {
        offset: Duration,
        sleeps: Vec<Duration>,
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
                inner: Arc::new(Mutex::new(Timeline::default())),
            }
        }

        /// Instant this clock started at (offset zero).
        pub fn origin(&self) -> Instant {
            self.origin
        }

        /// Advance the clock without recording a sleep.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut t) = self.inner.lock() {
                t.offset = t.offset.saturating_add(d);
            }
        }

        /// Time since origin.
        pub fn offset(&self) -> Duration {
            self.inner.lock().map(|t| t.offset).unwrap_or(Duration::ZERO)
        }

        /// Every sleep requested so far, in order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.inner
                .lock()
                .map(|t| t.sleeps.clone())
                .unwrap_or_default()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut t) = self.inner.lock() {
                t.offset = t.offset.saturating_add(d);
                t.sleeps.push(d);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sleep_advances_shared_timeline() {
            let clock = TestClock::new();
            let other = clock.clone();
            let epoch = clock.now();
            other.sleep(Duration::from_millis(100));
            clock.advance(Duration::from_millis(5));
            assert_eq!(clock.elapsed(epoch), Duration::from_millis(105));
            assert_eq!(clock.sleeps(), vec![Duration::from_millis(100)]);
        }
    }
}
