use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Millisecond tick source for cooperative scheduling.
///
/// - millis(): free-running millisecond counter that wraps at `u32::MAX`
/// - relax(): called from busy-wait loops between polls (never sleeps)
/// - ms_since(): elapsed milliseconds from an earlier `millis()` reading,
///   computed with wrapping arithmetic so rollover is transparent
pub trait Clock {
    fn millis(&self) -> u32;

    /// Hint issued once per busy-wait iteration.
    #[inline]
    fn relax(&self) {
        std::hint::spin_loop();
    }

    /// Milliseconds elapsed since `start`, modulo 2^32.
    #[inline]
    fn ms_since(&self, start: u32) -> u32 {
        self.millis().wrapping_sub(start)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn millis(&self) -> u32 {
        (**self).millis()
    }

    #[inline]
    fn relax(&self) {
        (**self).relax();
    }
}

/// Real-time clock backed by `std::time::Instant`, truncated to a wrapping
/// 32-bit millisecond counter like a microcontroller tick.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn millis(&self) -> u32 {
        // Truncation is the rollover.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Deterministic clock whose time is advanced by hand.
///
/// now = offset (wrapping)
/// relax() advances time by `relax_step_ms`, so busy-wait loops driven by
/// this clock make progress without real time passing. A step of 0 makes
/// relax() a no-op.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
    relax_step_ms: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an absolute tick (useful for rollover tests).
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Advance by `ms` on every relax() call.
    pub fn with_relax_step(mut self, ms: u32) -> Self {
        self.relax_step_ms = ms;
        self
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u32) {
        // fetch_add on AtomicU32 wraps on overflow.
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Set the absolute tick.
    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }

    fn relax(&self) {
        if self.relax_step_ms > 0 {
            self.advance(self.relax_step_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_wraps() {
        let clock = ManualClock::starting_at(u32::MAX - 5);
        let start = clock.millis();
        clock.advance(10);
        assert_eq!(clock.millis(), 4);
        assert_eq!(clock.ms_since(start), 10);
    }

    #[test]
    fn relax_step_advances_shared_time() {
        let clock = ManualClock::new().with_relax_step(3);
        let other = clock.clone();
        clock.relax();
        clock.relax();
        assert_eq!(other.millis(), 6);
    }

    #[test]
    fn monotonic_clock_starts_near_zero() {
        let clock = MonotonicClock::new();
        assert!(clock.millis() < 1_000);
    }
}
