//! Frame timing
//!
//! The timer owns its own epoch; there is no process-wide start time.
//! One `Timer` is constructed at startup (inside `AppContext`) and torn
//! down at shutdown.

use std::time::{Duration, Instant};

/// Frame timer with an owned epoch.
///
/// `tick()` is called exactly once per frame, before uniform updates, so
/// the same delta is observed by every consumer within a frame.
#[derive(Debug, Clone)]
pub struct Timer {
    epoch: Instant,
    last_tick: Instant,
    frame_delta: Duration,
}

impl Timer {
    /// Create a timer whose epoch is now
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            epoch: now,
            last_tick: now,
            frame_delta: Duration::ZERO,
        }
    }

    /// Advance to the next frame; returns the delta since the previous tick
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        self.frame_delta = now - self.last_tick;
        self.last_tick = now;
        self.frame_delta
    }

    /// Time since the timer was created
    pub fn elapsed(&self) -> Duration {
        self.last_tick - self.epoch
    }

    /// Time since the timer was created, in seconds
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Delta of the last completed tick, in milliseconds
    pub fn frame_delta_ms(&self) -> f32 {
        self.frame_delta.as_secs_f32() * 1000.0
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
    fn test_new_timer_has_zero_delta() {
        let timer = Timer::new();
        assert_eq!(timer.frame_delta_ms(), 0.0);
    }

    #[test]
    fn test_tick_advances_elapsed() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(2));
        timer.tick();
        assert!(timer.elapsed() >= Duration::from_millis(2));
        assert!(timer.frame_delta_ms() > 0.0);
    }

    #[test]
    fn test_elapsed_is_monotonic_across_ticks() {
        let mut timer = Timer::new();
        timer.tick();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(1));
        timer.tick();
        assert!(timer.elapsed() >= first);
    }
}
