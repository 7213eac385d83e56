use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

/// Source of wall-clock timestamps in milliseconds.
pub trait WallClock {
    fn now_ms(&self) -> f64;
}

impl<C: WallClock + ?Sized> WallClock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

/// Wall clock backed by [`SystemTime`]; it may jump backwards when the host
/// clock is adjusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to. Used for replays and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Turns wall-clock timestamps into the raw elapsed time fed to every channel.
///
/// The accumulator only grows. A timestamp earlier than the previous one adds
/// nothing, and measurement resumes from the new timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockAccumulator {
    last_wall_ms: f64,
    accumulated_ms: f64,
}

impl ClockAccumulator {
    pub fn new(start_ms: f64) -> Self {
        Self {
            last_wall_ms: start_ms,
            accumulated_ms: 0.0,
        }
    }

    pub fn start<C: WallClock + ?Sized>(clock: &C) -> Self {
        Self::new(clock.now_ms())
    }

    /// Folds in the time since the previous tick and returns raw elapsed seconds.
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        if !now_ms.is_finite() {
            warn!(now_ms, "ignoring non-finite wall-clock timestamp");
            return self.elapsed_seconds();
        }

        let delta = now_ms - self.last_wall_ms;
        if delta >= 0.0 {
            self.accumulated_ms += delta;
        } else {
            debug!(
                delta_ms = delta,
                "wall clock moved backwards; treating frame delta as zero"
            );
        }
        self.last_wall_ms = now_ms;
        self.elapsed_seconds()
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.accumulated_ms / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_exact_deltas() {
        let mut clock = ClockAccumulator::new(1_000.0);
        clock.tick(1_016.0);
        let at_t1 = clock.accumulated_ms();
        clock.tick(1_049.0);
        let at_t2 = clock.accumulated_ms();
        assert_eq!(at_t2 - at_t1, 33.0);
        assert_eq!(clock.elapsed_seconds(), 0.049);
    }

    #[test]
    fn regression_adds_nothing() {
        let mut clock = ClockAccumulator::new(5_000.0);
        assert_eq!(clock.tick(5_500.0), 0.5);
        assert_eq!(clock.tick(4_000.0), 0.5);
        // Measurement resumes from the adjusted timestamp.
        assert_eq!(clock.tick(4_250.0), 0.75);
    }

    #[test]
    fn ignores_non_finite_timestamps() {
        let mut clock = ClockAccumulator::new(0.0);
        clock.tick(100.0);
        assert_eq!(clock.tick(f64::NAN), 0.1);
        assert_eq!(clock.tick(200.0), 0.2);
    }

    #[test]
    fn starts_from_wall_clock() {
        let wall = ManualClock::new(42_000.0);
        let mut clock = ClockAccumulator::start(&wall);
        assert_eq!(clock.tick(wall.now_ms()), 0.0);
        wall.advance(250.0);
        assert_eq!(clock.tick(wall.now_ms()), 0.25);
    }

    #[test]
    fn system_clock_is_past_the_epoch() {
        assert!(SystemWallClock.now_ms() > 0.0);
    }
}
