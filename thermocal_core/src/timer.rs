//! Cooperative millisecond timer.
//!
//! Never blocks: callers poll `expired()` from their loop. Time arithmetic is
//! done modulo 2^32 so a deadline that straddles the clock rollover behaves
//! like any other.

use std::sync::Arc;

use thermocal_traits::Clock;

pub struct CoopTimer {
    clock: Arc<dyn Clock + Send + Sync>,
    deadline_ms: u32,
    start_ms: u32,
}

impl core::fmt::Debug for CoopTimer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoopTimer")
            .field("deadline_ms", &self.deadline_ms)
            .field("start_ms", &self.start_ms)
            .finish()
    }
}

impl CoopTimer {
    /// Create a timer anchored at the current tick.
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, deadline_ms: u32) -> Self {
        let start_ms = clock.millis();
        Self {
            clock,
            deadline_ms,
            start_ms,
        }
    }

    /// Restart the clock; the deadline is unchanged.
    pub fn reset(&mut self) {
        self.start_ms = self.clock.millis();
    }

    /// Change the deadline without moving the anchor.
    ///
    /// A shorter deadline may therefore already be expired on return.
    pub fn modify(&mut self, deadline_ms: u32) {
        self.deadline_ms = deadline_ms;
    }

    #[inline]
    pub fn deadline(&self) -> u32 {
        self.deadline_ms
    }

    /// Milliseconds since the last reset.
    #[inline]
    pub fn elapsed(&self) -> u32 {
        self.clock.ms_since(self.start_ms)
    }

    /// True once `elapsed() >= deadline`, until the next `reset()`.
    #[inline]
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermocal_traits::ManualClock;

    fn timer_at(clock: &ManualClock, deadline: u32) -> CoopTimer {
        CoopTimer::new(Arc::new(clock.clone()), deadline)
    }

    #[test]
    fn not_expired_right_after_reset() {
        let clock = ManualClock::new();
        let mut t = timer_at(&clock, 100);
        clock.advance(500);
        assert!(t.expired());
        t.reset();
        assert!(!t.expired());
        assert_eq!(t.elapsed(), 0);
    }

    #[test]
    fn expires_exactly_at_deadline_and_stays_expired() {
        let clock = ManualClock::new();
        let t = timer_at(&clock, 100);
        clock.advance(99);
        assert!(!t.expired());
        clock.advance(1);
        assert!(t.expired());
        clock.advance(10_000);
        assert!(t.expired());
    }

    #[test]
    fn modify_keeps_anchor() {
        let clock = ManualClock::new();
        let mut t = timer_at(&clock, 1_000);
        clock.advance(400);

        // Shorter deadline than elapsed: expired immediately.
        t.modify(300);
        assert!(t.expired());
        assert_eq!(t.elapsed(), 400);

        // Shorter than the original but longer than elapsed: not yet.
        t.modify(500);
        assert!(!t.expired());
        clock.advance(100);
        assert!(t.expired());
    }

    #[test]
    fn zero_deadline_is_always_expired() {
        let clock = ManualClock::new();
        let mut t = timer_at(&clock, 0);
        t.reset();
        assert!(t.expired());
    }

    #[test]
    fn survives_clock_rollover() {
        let clock = ManualClock::starting_at(u32::MAX - 50);
        let mut t = timer_at(&clock, 100);
        t.reset();
        clock.advance(60); // tick wrapped to 9
        assert_eq!(t.elapsed(), 60);
        assert!(!t.expired());
        clock.advance(40);
        assert!(t.expired());
    }
}
