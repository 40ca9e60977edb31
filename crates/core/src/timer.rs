//! Wall-clock timer driving time-based uniform updates.

use std::time::{Duration, Instant};

/// Measures time since construction.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in seconds since the timer was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = Timer::new();
        let a = timer.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() > a);
    }

    #[test]
    fn test_elapsed_secs_tracks_elapsed() {
        let timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed_secs() >= 0.005);
    }
}
