//! Monotonic time for wait intervals and the run's wall time.
//! [Instant] never goes backwards, unlike the system clock, so an interval is never negative.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod test {
    use std::thread::sleep;

    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let watch = Stopwatch::start();
        let a = watch.elapsed();
        sleep(Duration::from_millis(10));
        let b = watch.elapsed();
        assert!(b >= a + Duration::from_millis(10));
    }
}
